//! Built-in fingerprint profiles.
//!
//! Contains predefined profiles for Chrome, Safari, Firefox, Opera and OkHttp.

pub mod chrome;
pub mod firefox;
pub mod okhttp;
pub mod opera;
pub mod safari;

pub use chrome::Chrome;
pub use firefox::Firefox;
pub use okhttp::OkHttp;
pub use opera::Opera;
pub use safari::Safari;
