//! Well-known status-store entry names written by the external update workers.

pub const XML_UPDATE_STATUS: &str = "xml_update_status";
pub const YML_UPDATE_STATUS: &str = "yml_update_status";
pub const PARSER_STATUS: &str = "parser_status";
pub const XML_UPDATE_TIME: &str = "xml_update_time";
pub const YML_UPDATE_TIME: &str = "yml_update_time";
pub const PARSER_UPDATE_TIME: &str = "parser_update_time";

/// Entries shown on the status dashboard, in display order.
pub const WELL_KNOWN_KEYS: [&str; 6] = [
    XML_UPDATE_STATUS,
    YML_UPDATE_STATUS,
    XML_UPDATE_TIME,
    YML_UPDATE_TIME,
    PARSER_STATUS,
    PARSER_UPDATE_TIME,
];

const MAX_NAME_LEN: usize = 64;

/// Status names are lowercase snake_case identifiers of at most 64 chars.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
