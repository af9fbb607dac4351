//! Opera browser profiles.
//!
//! Opera 89 to 91 run on Chromium 103 to 105 and match those releases on the
//! wire.

use super::chrome::{chrome_client_hello, chrome_h2};
use crate::emulation::{Emulation, EmulationFactory};

/// Opera versions for emulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Opera {
    V89,
    V90,
    V91,
}

impl Default for Opera {
    fn default() -> Self {
        Opera::V91
    }
}

impl Opera {
    pub const ALL: &'static [Opera] = &[Opera::V89, Opera::V90, Opera::V91];

    pub fn name(self) -> &'static str {
        match self {
            Opera::V89 => "opera_89",
            Opera::V90 => "opera_90",
            Opera::V91 => "opera_91",
        }
    }
}

impl EmulationFactory for Opera {
    fn emulation(self) -> Emulation {
        Emulation {
            name: self.name().to_string(),
            tls: chrome_client_hello(),
            http2: chrome_h2(false),
            permute_extensions: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulation::profiles::Chrome;

    #[test]
    fn test_opera_matches_chromium_105() {
        let opera = Opera::V91.emulation();
        let chrome = Chrome::V105.emulation();
        assert_eq!(opera.pool_key(), chrome.pool_key());
        assert_ne!(opera.name, chrome.name);
    }
}
