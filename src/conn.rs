use {
    log::{debug, info, trace, warn},
    std::{cell::Cell, rc::Rc},
};

use crate::{
    codec::NotifyMask,
    error::{Error, Result},
    native::{self, xlib::XlibBackend, Backend, Status, Window},
};

/// An open session with the display server.
///
/// Shared through `Rc` by every handle fetched from it. Dropping the last
/// reference closes the session unless [`close`](Connection::close) already did.
pub struct Connection {
    backend: Box<dyn Backend>,
    closed: Cell<bool>,
    lock_depth: Cell<usize>,
}

/// Result of `XRRGetScreenSizeRange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSizeRange {
    pub status: Status,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
}

impl Connection {
    /// Opens a connection; `None` falls back to `$DISPLAY`.
    pub fn open(name: Option<&str>) -> Result<Rc<Self>> {
        let c_name = name.map(|n| native::c_string(n.as_bytes())).transpose()?;
        let backend = XlibBackend::open(c_name.as_deref())
            .map_err(|name| Error::ConnectionFailure { name })?;
        info!("connected to display {}", Self::display_name(name)?);
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Wraps an already open session.
    pub fn with_backend(backend: Box<dyn Backend>) -> Rc<Self> {
        Rc::new(Connection {
            backend,
            closed: Cell::new(false),
            lock_depth: Cell::new(0),
        })
    }

    /// The display name `open` would use for `name`.
    pub fn display_name(name: Option<&str>) -> Result<String> {
        let c_name = name.map(|n| native::c_string(n.as_bytes())).transpose()?;
        Ok(XlibBackend::display_name(c_name.as_deref()))
    }

    /// Closes the session. Closing twice is a caller error.
    pub fn close(&self) -> Result<()> {
        if self.closed.get() {
            return Err(Error::ConnectionClosed);
        }
        if self.lock_depth.get() > 0 {
            warn!("closing display with {} unreleased locks", self.lock_depth.get());
        }
        self.closed.set(true);
        self.backend.close();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// The backend, for issuing requests. Fails once the connection is closed.
    pub(crate) fn native(&self) -> Result<&dyn Backend> {
        if self.closed.get() {
            Err(Error::ConnectionClosed)
        } else {
            Ok(self.backend.as_ref())
        }
    }

    /// The backend regardless of state. Releasing client-side memory does not
    /// touch the session.
    pub(crate) fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Locks the connection for the current thread. Calls may be nested and
    /// must be balanced by [`unlock`](Connection::unlock).
    pub fn lock(&self) -> Result<()> {
        self.native()?.lock();
        self.lock_depth.set(self.lock_depth.get() + 1);
        Ok(())
    }

    pub fn unlock(&self) -> Result<()> {
        let native = self.native()?;
        let depth = self.lock_depth.get();
        if depth == 0 {
            return Err(Error::NotLocked);
        }
        native.unlock();
        self.lock_depth.set(depth - 1);
        Ok(())
    }

    /// Locks the connection until the returned guard drops.
    pub fn locked(&self) -> Result<DisplayLock<'_>> {
        self.lock()?;
        Ok(DisplayLock { cm: self })
    }

    pub fn default_screen(&self) -> Result<i32> {
        Ok(self.native()?.default_screen())
    }

    pub fn screen_count(&self) -> Result<i32> {
        Ok(self.native()?.screen_count())
    }

    pub fn root_window(&self, screen: i32) -> Result<Window> {
        Ok(self.native()?.root_window(screen))
    }

    pub fn default_root_window(&self) -> Result<Window> {
        let native = self.native()?;
        Ok(native.root_window(native.default_screen()))
    }

    /// Width of `screen` in pixels.
    pub fn display_width(&self, screen: i32) -> Result<i32> {
        Ok(self.native()?.display_width(screen))
    }

    /// Height of `screen` in pixels.
    pub fn display_height(&self, screen: i32) -> Result<i32> {
        Ok(self.native()?.display_height(screen))
    }

    /// `(event_base, error_base)` when the RandR extension is present.
    pub fn query_extension(&self) -> Result<Option<(i32, i32)>> {
        Ok(self.native()?.query_extension())
    }

    /// `(status, major, minor)`.
    pub fn query_version(&self) -> Result<(Status, i32, i32)> {
        Ok(self.native()?.query_version())
    }

    pub fn select_input(&self, window: Window, mask: NotifyMask) -> Result<()> {
        self.native()?.select_input(window, mask.bits());
        Ok(())
    }

    pub fn get_screen_size_range(&self, window: Window) -> Result<ScreenSizeRange> {
        let raw = self.native()?.get_screen_size_range(window);
        Ok(ScreenSizeRange {
            status: raw.status,
            min_width: raw.min_width,
            min_height: raw.min_height,
            max_width: raw.max_width,
            max_height: raw.max_height,
        })
    }

    pub fn set_screen_size(
        &self,
        window: Window,
        width: i32,
        height: i32,
        mm_width: i32,
        mm_height: i32,
    ) -> Result<()> {
        self.native()?
            .set_screen_size(window, width, height, mm_width, mm_height);
        Ok(())
    }

    /// `window`, or the default root window when absent.
    pub(crate) fn window_or_root(&self, window: Option<Window>) -> Result<Window> {
        match window {
            Some(window) => Ok(window),
            None => self.default_root_window(),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // A connection closed explicitly is already finished with.
        if self.closed.get() {
            trace!("dropping closed display connection");
            return;
        }
        debug!("closing display connection on drop");
        self.closed.set(true);
        self.backend.close();
    }
}

/// Holds a display lock; unlocks on drop.
pub struct DisplayLock<'a> {
    cm: &'a Connection,
}

impl<'a> Drop for DisplayLock<'a> {
    fn drop(&mut self) {
        if let Err(e) = self.cm.unlock() {
            warn!("failed to release display lock: {}", e);
        }
    }
}
