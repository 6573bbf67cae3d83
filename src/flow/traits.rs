use std::sync::Arc;

use url::Url;

use super::types::Notice;

/// Host-provided navigation and notice surface.
///
/// In a browser this is `history.replaceState`, the client router and a toast
/// component. The flow never reloads the page.
///
/// # Example
///
/// ```rust,ignore
/// impl Navigator for BrowserShell {
///     fn replace_url(&self, url: &Url) {
///         self.history.replace_state_with_url(&JsValue::NULL, "", Some(url.as_str())).ok();
///     }
///
///     fn navigate(&self, path: &str) {
///         self.router.push(path);
///     }
///
///     fn notify(&self, notice: Notice) {
///         self.toasts.show(notice);
///     }
/// }
/// ```
pub trait Navigator: Send + Sync + 'static {
    /// Replace the visible location without reloading.
    fn replace_url(&self, url: &Url);

    /// Client-side navigation to an in-app path.
    fn navigate(&self, path: &str);

    /// Show a transient notice.
    fn notify(&self, notice: Notice);
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn replace_url(&self, url: &Url) {
        (**self).replace_url(url);
    }

    fn navigate(&self, path: &str) {
        (**self).navigate(path);
    }

    fn notify(&self, notice: Notice) {
        (**self).notify(notice);
    }
}
