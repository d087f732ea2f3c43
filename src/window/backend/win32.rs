use std::ffi::c_void;

use tracing::*;
use windows::{
  core::{HSTRING, PCWSTR},
  Win32::{
    Foundation::*,
    Graphics::Gdi::{GetMonitorInfoW, MonitorFromWindow, MONITORINFO, MONITOR_DEFAULTTONEAREST},
    System::LibraryLoader::GetModuleHandleW,
    UI::WindowsAndMessaging::{
      self,
      AdjustWindowRect,
      CreateWindowExW,
      DefWindowProcW,
      DestroyWindow,
      DispatchMessageW,
      GetMessageW,
      GetWindowLongPtrW,
      GetWindowRect,
      LoadCursorW,
      PostMessageW,
      PostQuitMessage,
      RegisterClassExW,
      SetWindowLongPtrW,
      SetWindowPos,
      SetWindowTextW,
      ShowWindow,
      TranslateMessage,
      UnregisterClassW,
      CREATESTRUCTW,
      MSG,
      WINDOW_EX_STYLE,
      WINDOW_STYLE,
      WNDCLASSEXW,
    },
  },
};

use super::{Backend, CreationRequest, ModuleInstance, RawHandle, ShowCommand};
use crate::{
  error::{WindowError, WindowResult},
  window::{
    message::{Message, Response},
    registry::{self, ClassRegistry, WindowId},
    settings::{Rect, Size, Style},
  },
};

/// Win32 classes are registered per process.
static CLASSES: ClassRegistry = ClassRegistry::new();

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Backend;

impl Win32Backend {
  pub fn new() -> Self {
    Self
  }

  fn hinstance() -> WindowResult<HINSTANCE> {
    Ok(unsafe { GetModuleHandleW(None)? }.into())
  }
}

fn hwnd(handle: RawHandle) -> HWND {
  HWND(handle.get() as _)
}

fn to_rect(rect: RECT) -> Rect {
  Rect::new(rect.left, rect.top, rect.right, rect.bottom)
}

/// Routes native messages to the registry. The window id travels as creation
/// data and is kept in the window's user-data slot afterwards.
extern "system" fn wnd_proc(hwnd: HWND, msg: u32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
  if msg == WindowsAndMessaging::WM_NCCREATE {
    let create_struct = unsafe { &*(l_param.0 as *const CREATESTRUCTW) };
    let raw_id = create_struct.lpCreateParams as usize as isize;
    unsafe { SetWindowLongPtrW(hwnd, WindowsAndMessaging::GWLP_USERDATA, raw_id) };
  }

  let raw_id = unsafe { GetWindowLongPtrW(hwnd, WindowsAndMessaging::GWLP_USERDATA) };
  let target = WindowId::from_raw(raw_id as u64).zip(RawHandle::new(hwnd.0 as isize));

  if let Some((id, handle)) = target {
    let message = Message::decode(msg, w_param.0, l_param.0);
    if registry::dispatch(id, handle, message) == Response::Handled {
      return LRESULT(0);
    }
  }

  unsafe { DefWindowProcW(hwnd, msg, w_param, l_param) }
}

impl Backend for Win32Backend {
  fn class_registry(&self) -> &ClassRegistry {
    &CLASSES
  }

  fn module_instance(&self) -> ModuleInstance {
    Self::hinstance()
      .map(|hinstance| ModuleInstance(hinstance.0 as isize))
      .unwrap_or_default()
  }

  fn register_class(&self, class_name: &str) -> WindowResult<()> {
    let class_name = HSTRING::from(class_name);
    let wc = WNDCLASSEXW {
      cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
      style: WindowsAndMessaging::CS_VREDRAW
        | WindowsAndMessaging::CS_HREDRAW
        | WindowsAndMessaging::CS_OWNDC,
      lpfnWndProc: Some(wnd_proc),
      hInstance: Self::hinstance()?,
      hCursor: unsafe { LoadCursorW(None, WindowsAndMessaging::IDC_ARROW) }.unwrap_or_default(),
      lpszClassName: PCWSTR(class_name.as_ptr()),
      ..Default::default()
    };

    let atom = unsafe { RegisterClassExW(&wc) };
    if atom == 0 {
      let error = unsafe { GetLastError() };
      if error != ERROR_CLASS_ALREADY_EXISTS {
        return Err(windows::core::Error::from(error.to_hresult()).into());
      }
    }
    Ok(())
  }

  fn unregister_class(&self, class_name: &str) -> WindowResult<()> {
    let class_name = HSTRING::from(class_name);
    unsafe { UnregisterClassW(PCWSTR(class_name.as_ptr()), Self::hinstance()?)? };
    Ok(())
  }

  fn adjust_size(&self, client: Size, style: Style) -> Size {
    let mut rect = RECT {
      left: 0,
      top: 0,
      right: client.width as i32,
      bottom: client.height as i32,
    };

    match unsafe { AdjustWindowRect(&mut rect, WINDOW_STYLE(style.0), FALSE) } {
      Ok(()) => to_rect(rect).size(),
      Err(error) => {
        warn!("failed to adjust window size: {error}");
        client
      }
    }
  }

  fn create_window(&self, request: &CreationRequest) -> WindowResult<RawHandle> {
    let class_name = HSTRING::from(request.class_name.as_str());
    let title = HSTRING::from(request.title.as_str());

    let hwnd = unsafe {
      CreateWindowExW(
        WINDOW_EX_STYLE::default(),
        &class_name,
        &title,
        WINDOW_STYLE(request.style.0),
        WindowsAndMessaging::CW_USEDEFAULT,
        WindowsAndMessaging::CW_USEDEFAULT,
        request.size.width as i32,
        request.size.height as i32,
        None,
        None,
        Self::hinstance()?,
        Some(request.id.into_raw() as usize as *const c_void),
      )
    }
    .map_err(|error| WindowError::Creation(error.to_string()))?;

    RawHandle::new(hwnd.0 as isize)
      .ok_or_else(|| WindowError::Creation("backend returned a null window handle".to_owned()))
  }

  fn show_window(&self, handle: RawHandle, command: ShowCommand) {
    let command = match command {
      ShowCommand::Default => WindowsAndMessaging::SW_SHOWDEFAULT,
      ShowCommand::Normal => WindowsAndMessaging::SW_SHOWNORMAL,
      ShowCommand::Maximized => WindowsAndMessaging::SW_SHOWMAXIMIZED,
      ShowCommand::Hidden => WindowsAndMessaging::SW_HIDE,
    };
    let _ = unsafe { ShowWindow(hwnd(handle), command) };
  }

  fn destroy_window(&self, handle: RawHandle) -> WindowResult<()> {
    unsafe { DestroyWindow(hwnd(handle))? };
    Ok(())
  }

  fn post_quit(&self, _handle: RawHandle) {
    unsafe { PostQuitMessage(0) };
  }

  fn run_event_loop(&self, _handle: RawHandle) -> WindowResult<()> {
    let mut msg = MSG::default();
    loop {
      match unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 {
        0 => return Ok(()),
        -1 => return Err(windows::core::Error::from_win32().into()),
        _ => unsafe {
          let _ = TranslateMessage(&msg);
          DispatchMessageW(&msg);
        },
      }
    }
  }

  fn post_message(&self, handle: RawHandle, message: Message) -> WindowResult<()> {
    let (msg, w_param, l_param) = message.encode();
    unsafe { PostMessageW(hwnd(handle), msg, WPARAM(w_param), LPARAM(l_param))? };
    Ok(())
  }

  fn set_title(&self, handle: RawHandle, title: &str) -> WindowResult<()> {
    // sent, not posted: the window thread copies the text before this returns
    unsafe { SetWindowTextW(hwnd(handle), &HSTRING::from(title))? };
    Ok(())
  }

  fn window_rect(&self, handle: RawHandle) -> WindowResult<Rect> {
    let mut rect = RECT::default();
    unsafe { GetWindowRect(hwnd(handle), &mut rect)? };
    Ok(to_rect(rect))
  }

  fn set_window_rect(&self, handle: RawHandle, rect: Rect) -> WindowResult<()> {
    unsafe {
      SetWindowPos(
        hwnd(handle),
        None,
        rect.left,
        rect.top,
        rect.width() as i32,
        rect.height() as i32,
        WindowsAndMessaging::SWP_NOZORDER
          | WindowsAndMessaging::SWP_NOACTIVATE
          | WindowsAndMessaging::SWP_FRAMECHANGED,
      )?
    };
    Ok(())
  }

  fn style(&self, handle: RawHandle) -> WindowResult<Style> {
    let style = unsafe { GetWindowLongPtrW(hwnd(handle), WindowsAndMessaging::GWL_STYLE) };
    Ok(Style(style as u32))
  }

  fn set_style(&self, handle: RawHandle, style: Style) -> WindowResult<()> {
    unsafe { SetWindowLongPtrW(hwnd(handle), WindowsAndMessaging::GWL_STYLE, style.0 as isize) };
    Ok(())
  }

  fn monitor_rect(&self, handle: RawHandle) -> WindowResult<Rect> {
    let monitor = unsafe { MonitorFromWindow(hwnd(handle), MONITOR_DEFAULTTONEAREST) };
    let mut info = MONITORINFO {
      cbSize: std::mem::size_of::<MONITORINFO>() as u32,
      ..Default::default()
    };

    if unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
      Ok(to_rect(info.rcMonitor))
    } else {
      Err(windows::core::Error::from_win32().into())
    }
  }
}
