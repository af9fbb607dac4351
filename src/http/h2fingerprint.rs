//! HTTP/2 fingerprint parameters.
//!
//! Anti-bot systems fingerprint HTTP/2 at several levels:
//! - SETTINGS parameter order and values
//! - pseudo-header order in HEADERS frames
//! - the connection-level WINDOW_UPDATE sent after the preface
//! - PRIORITY frames sent after the handshake, and the priority block on HEADERS
//!
//! [`H2Fingerprint`] describes all of these with the `http2` crate's frame
//! types and turns into a configured [`http2::client::Builder`]. Settings are
//! a single ordered association list, so order and values cannot disagree.

use crate::base::neterror::NetError;
use http2::client::Builder;
use serde::{Deserialize, Serialize};

// Re-export from http2 crate for fingerprint control
pub use http2::frame::{
    ExperimentalSettings, Priorities, Priority, PseudoId, PseudoOrder, Setting, SettingId,
    SettingsOrder, StreamDependency, StreamId,
};

/// RFC 9113 initial window, for streams and for the connection.
pub const DEFAULT_WINDOW: u32 = 65_535;

const MAX_WINDOW: u32 = (1 << 31) - 1;

/// `:method :authority :scheme :path`
pub const CHROME_PSEUDO_ORDER: [PseudoId; 4] = [
    PseudoId::Method,
    PseudoId::Authority,
    PseudoId::Scheme,
    PseudoId::Path,
];

/// `:method :path :authority :scheme`
pub const FIREFOX_PSEUDO_ORDER: [PseudoId; 4] = [
    PseudoId::Method,
    PseudoId::Path,
    PseudoId::Authority,
    PseudoId::Scheme,
];

/// `:method :scheme :path :authority`
pub const SAFARI_PSEUDO_ORDER: [PseudoId; 4] = [
    PseudoId::Method,
    PseudoId::Scheme,
    PseudoId::Path,
    PseudoId::Authority,
];

/// Setting identifier for a `customTlsClient` name.
pub fn setting_from_name(name: &str) -> Option<SettingId> {
    let id = match name {
        "HEADER_TABLE_SIZE" => SettingId::HeaderTableSize,
        "ENABLE_PUSH" => SettingId::EnablePush,
        "MAX_CONCURRENT_STREAMS" => SettingId::MaxConcurrentStreams,
        "INITIAL_WINDOW_SIZE" => SettingId::InitialWindowSize,
        "MAX_FRAME_SIZE" => SettingId::MaxFrameSize,
        "MAX_HEADER_LIST_SIZE" => SettingId::MaxHeaderListSize,
        "UNKNOWN_SETTING_7" => SettingId::Unknown(0x7),
        "UNKNOWN_SETTING_8" => SettingId::EnableConnectProtocol,
        "UNKNOWN_SETTING_9" => SettingId::NoRfc7540Priorities,
        _ => return None,
    };
    Some(id)
}

/// Wire identifier of a setting.
pub fn setting_code(id: SettingId) -> u16 {
    u16::from(id)
}

fn check_setting(id: SettingId, value: u32) -> Result<(), NetError> {
    let ok = match setting_code(id) {
        0x2 | 0x8 | 0x9 => value <= 1,
        0x4 => value <= MAX_WINDOW,
        0x5 => (16_384..=16_777_215).contains(&value),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(NetError::InvalidProfile(format!(
            "value {} out of range for setting {}",
            value,
            setting_code(id)
        )))
    }
}

pub fn pseudo_from_name(name: &str) -> Option<PseudoId> {
    match name {
        ":method" => Some(PseudoId::Method),
        ":authority" => Some(PseudoId::Authority),
        ":scheme" => Some(PseudoId::Scheme),
        ":path" => Some(PseudoId::Path),
        _ => None,
    }
}

fn pseudo_letter(id: PseudoId) -> &'static str {
    match id {
        PseudoId::Method => "m",
        PseudoId::Authority => "a",
        PseudoId::Scheme => "s",
        PseudoId::Path => "p",
        _ => "?",
    }
}

/// Parse a caller order; it must be a permutation of the four request
/// pseudo-headers.
pub fn parse_pseudo_order<S: AsRef<str>>(names: &[S]) -> Result<[PseudoId; 4], NetError> {
    if names.len() != 4 {
        return Err(NetError::InvalidProfile(format!(
            "pseudo header order needs 4 entries, got {}",
            names.len()
        )));
    }
    let mut ids = CHROME_PSEUDO_ORDER;
    for (i, name) in names.iter().enumerate() {
        let id = pseudo_from_name(name.as_ref()).ok_or_else(|| {
            NetError::InvalidProfile(format!("unknown pseudo header: {}", name.as_ref()))
        })?;
        if ids[..i].contains(&id) {
            return Err(NetError::InvalidProfile(format!(
                "duplicate pseudo header: {}",
                name.as_ref()
            )));
        }
        ids[i] = id;
    }
    Ok(ids)
}

/// Stream dependency block as written in a profile. `weight` is the wire
/// value, one less than the effective weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityParam {
    #[serde(default)]
    pub stream_dep: u32,
    #[serde(default)]
    pub exclusive: bool,
    #[serde(default)]
    pub weight: u8,
}

impl PriorityParam {
    pub const fn new(stream_dep: u32, weight: u8, exclusive: bool) -> Self {
        Self {
            stream_dep,
            exclusive,
            weight,
        }
    }

    pub fn stream_dependency(&self) -> StreamDependency {
        StreamDependency::new(StreamId::from(self.stream_dep), self.weight, self.exclusive)
    }
}

/// A PRIORITY frame sent right after the connection preface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityFrame {
    #[serde(rename = "streamID")]
    pub stream_id: u32,
    pub priority_param: PriorityParam,
}

impl PriorityFrame {
    pub const fn new(stream_id: u32, priority_param: PriorityParam) -> Self {
        Self {
            stream_id,
            priority_param,
        }
    }
}

/// Full HTTP/2 fingerprint of one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct H2Fingerprint {
    /// SETTINGS entries in emission order.
    pub settings: Vec<(SettingId, u32)>,
    pub pseudo_order: [PseudoId; 4],
    /// Increment of the connection-level WINDOW_UPDATE; `0` sends none.
    pub connection_flow: u32,
    pub priorities: Vec<PriorityFrame>,
    pub header_priority: Option<PriorityParam>,
}

impl Default for H2Fingerprint {
    /// A client that states no preferences.
    fn default() -> Self {
        Self {
            settings: Vec::new(),
            pseudo_order: CHROME_PSEUDO_ORDER,
            connection_flow: 0,
            priorities: Vec::new(),
            header_priority: None,
        }
    }
}

impl H2Fingerprint {
    pub fn builder() -> H2FingerprintBuilder {
        H2FingerprintBuilder::default()
    }

    pub fn setting(&self, code: u16) -> Option<u32> {
        self.settings
            .iter()
            .find(|(id, _)| setting_code(*id) == code)
            .map(|(_, v)| *v)
    }

    /// Window every new stream starts with on the receive side.
    pub fn initial_stream_window(&self) -> u32 {
        self.setting(0x4).unwrap_or(DEFAULT_WINDOW)
    }

    /// Streams named by PRIORITY frames are idle placeholders; requests
    /// start on the first odd id above them.
    pub fn first_stream_id(&self) -> u32 {
        self.priorities
            .iter()
            .map(|p| p.stream_id)
            .max()
            .map(|max| (max + 2) | 1)
            .unwrap_or(1)
    }

    /// Short pseudo-header order, e.g. `m,a,s,p`.
    pub fn pseudo_short(&self) -> String {
        self.pseudo_order
            .iter()
            .map(|id| pseudo_letter(*id))
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn headers_pseudo_order(&self) -> PseudoOrder {
        PseudoOrder::builder().extend(self.pseudo_order).build()
    }

    pub fn settings_order(&self) -> SettingsOrder {
        SettingsOrder::builder()
            .extend(self.settings.iter().map(|(id, _)| *id))
            .build()
    }

    pub fn priority_tree(&self) -> Option<Priorities> {
        if self.priorities.is_empty() {
            return None;
        }
        let frames = self.priorities.iter().map(|p| {
            Priority::new(
                StreamId::from(p.stream_id),
                p.priority_param.stream_dependency(),
            )
        });
        Some(Priorities::builder().extend(frames).build())
    }

    /// Client connection builder that reproduces this fingerprint.
    pub fn client_builder(&self) -> Builder {
        let mut builder = Builder::new();
        let mut experimental = Vec::new();
        for &(id, value) in &self.settings {
            match setting_code(id) {
                0x1 => {
                    builder.header_table_size(value);
                }
                0x2 => {
                    builder.enable_push(value != 0);
                }
                0x3 => {
                    builder.max_concurrent_streams(value);
                }
                0x4 => {
                    builder.initial_window_size(value);
                }
                0x5 => {
                    builder.max_frame_size(value);
                }
                0x6 => {
                    builder.max_header_list_size(value);
                }
                0x8 => {
                    builder.enable_connect_protocol(value != 0);
                }
                0x9 => {
                    builder.no_rfc7540_priorities(value != 0);
                }
                _ => experimental.push(Setting::from_id(id, value)),
            }
        }
        if !experimental.is_empty() {
            builder.experimental_settings(ExperimentalSettings::builder().extend(experimental).build());
        }

        builder
            .settings_order(self.settings_order())
            .headers_pseudo_order(self.headers_pseudo_order())
            .initial_stream_id(self.first_stream_id());

        if self.connection_flow > 0 {
            builder.initial_connection_window_size(
                DEFAULT_WINDOW.saturating_add(self.connection_flow).min(MAX_WINDOW),
            );
        }
        if let Some(tree) = self.priority_tree() {
            builder.priorities(tree);
        }
        if let Some(param) = self.header_priority {
            builder.headers_stream_dependency(param.stream_dependency());
        }
        builder
    }

    /// Akamai-style text: `settings|window_update|priorities|pseudo_order`.
    pub fn akamai_string(&self) -> String {
        let settings = self
            .settings
            .iter()
            .map(|(id, v)| format!("{}:{}", setting_code(*id), v))
            .collect::<Vec<_>>()
            .join(";");
        let priorities = if self.priorities.is_empty() {
            "0".to_string()
        } else {
            self.priorities
                .iter()
                .map(|p| {
                    let param = p.priority_param;
                    format!(
                        "{}:{}:{}:{}",
                        p.stream_id,
                        u8::from(param.exclusive),
                        param.stream_dep,
                        u16::from(param.weight) + 1
                    )
                })
                .collect::<Vec<_>>()
                .join(",")
        };
        format!(
            "{}|{}|{}|{}",
            settings,
            self.connection_flow,
            priorities,
            self.pseudo_short()
        )
    }
}

/// Builder for [`H2Fingerprint`]; `build` validates the result.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct H2FingerprintBuilder {
    inner: H2Fingerprint,
}

impl H2FingerprintBuilder {
    /// Append a setting; later entries keep their position in the frame.
    pub fn setting(mut self, id: SettingId, value: u32) -> Self {
        self.inner.settings.push((id, value));
        self
    }

    pub fn pseudo_order(mut self, order: [PseudoId; 4]) -> Self {
        self.inner.pseudo_order = order;
        self
    }

    pub fn connection_flow(mut self, flow: u32) -> Self {
        self.inner.connection_flow = flow;
        self
    }

    pub fn priority(mut self, stream_id: u32, param: PriorityParam) -> Self {
        self.inner.priorities.push(PriorityFrame::new(stream_id, param));
        self
    }

    pub fn header_priority(mut self, param: PriorityParam) -> Self {
        self.inner.header_priority = Some(param);
        self
    }

    pub fn build(self) -> Result<H2Fingerprint, NetError> {
        let fp = self.inner;

        for (i, (id, value)) in fp.settings.iter().enumerate() {
            if fp.settings[..i].iter().any(|(seen, _)| seen == id) {
                return Err(NetError::InvalidProfile(format!(
                    "duplicate setting {}",
                    setting_code(*id)
                )));
            }
            check_setting(*id, *value)?;
        }

        if fp.connection_flow > MAX_WINDOW {
            return Err(NetError::InvalidProfile(format!(
                "connection flow {} exceeds 2^31-1",
                fp.connection_flow
            )));
        }

        for (i, p) in fp.priorities.iter().enumerate() {
            if p.stream_id == 0 || p.stream_id > MAX_WINDOW {
                return Err(NetError::InvalidProfile(format!(
                    "invalid priority stream id {}",
                    p.stream_id
                )));
            }
            if p.priority_param.stream_dep == p.stream_id {
                return Err(NetError::InvalidProfile(format!(
                    "stream {} depends on itself",
                    p.stream_id
                )));
            }
            if p.priority_param.stream_dep > MAX_WINDOW {
                return Err(NetError::InvalidProfile(format!(
                    "invalid stream dependency {}",
                    p.priority_param.stream_dep
                )));
            }
            if fp.priorities[..i].iter().any(|q| q.stream_id == p.stream_id) {
                return Err(NetError::InvalidProfile(format!(
                    "duplicate priority frame for stream {}",
                    p.stream_id
                )));
            }
        }
        if let Some(hp) = fp.header_priority {
            if hp.stream_dep > MAX_WINDOW {
                return Err(NetError::InvalidProfile(format!(
                    "invalid header priority dependency {}",
                    hp.stream_dep
                )));
            }
        }

        Ok(fp)
    }
}
