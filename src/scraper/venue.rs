//! Venue name to venue code lookup

/// Shown in place of a code for venues outside the table
pub const UNKNOWN_VENUE: &str = "Unknown";

const VENUES: [(&str, &str); 10] = [
    ("札幌", "01"),
    ("函館", "02"),
    ("福島", "03"),
    ("新潟", "04"),
    ("東京", "05"),
    ("中山", "06"),
    ("中京", "07"),
    ("京都", "08"),
    ("阪神", "09"),
    ("小倉", "10"),
];

/// Two-digit code of a central venue
pub fn venue_code(name: &str) -> Option<&'static str> {
    let name = name.trim();
    VENUES
        .iter()
        .find(|(venue, _)| *venue == name)
        .map(|(_, code)| *code)
}

/// Display form of the lookup: the code, or [`UNKNOWN_VENUE`]
pub fn venue_code_or_unknown(name: &str) -> &'static str {
    venue_code(name).unwrap_or(UNKNOWN_VENUE)
}

/// All venues with their codes, in code order
pub fn venues() -> impl Iterator<Item = (&'static str, &'static str)> {
    VENUES.iter().copied()
}
