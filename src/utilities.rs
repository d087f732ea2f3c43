use std::ops::BitAnd;

pub fn lo_word(dword: u32) -> u16 {
  dword as u16
}

pub fn hi_word(dword: u32) -> u16 {
  (dword >> 16) as u16
}

pub fn is_flag_set<T: Copy + BitAnd<T, Output = T> + PartialEq<T>>(
  var: T,
  flag: T,
) -> bool {
  (var & flag) == flag
}

/// Packs two 32-bit halves into one word so they can be published together.
pub(crate) fn pack(hi: u32, lo: u32) -> u64 {
  ((hi as u64) << 32) | lo as u64
}

pub(crate) fn unpack(word: u64) -> (u32, u32) {
  ((word >> 32) as u32, word as u32)
}
