//! Telnet stream cleanup.
//!
//! Games speak telnet. [`TelnetFilter`] removes IAC command sequences from
//! the inbound byte stream and refuses every option the server offers or
//! requests. [`Utf8Decoder`] turns the remaining bytes into text, carrying
//! an incomplete multi-byte character over to the next read.

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum FilterState {
    #[default]
    Text,
    Command,
    Option(u8),
    Subnegotiation,
    SubnegotiationIac,
}

/// Result of filtering one chunk.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filtered {
    /// Payload bytes with telnet commands removed
    pub data: Vec<u8>,
    /// Negotiation replies to send back
    pub replies: Vec<u8>,
}

/// Incremental IAC stripper. State survives between chunks, so a command
/// split across two reads is still recognised.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: FilterState,
}

impl TelnetFilter {
    /// Create a filter in text state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one chunk of inbound bytes.
    pub fn feed(&mut self, chunk: &[u8]) -> Filtered {
        let mut out = Filtered {
            data: Vec::with_capacity(chunk.len()),
            replies: Vec::new(),
        };

        for &byte in chunk {
            self.state = match (self.state, byte) {
                (FilterState::Text, IAC) => FilterState::Command,
                (FilterState::Text, b) => {
                    out.data.push(b);
                    FilterState::Text
                }
                (FilterState::Command, IAC) => {
                    out.data.push(IAC);
                    FilterState::Text
                }
                (FilterState::Command, DO | DONT | WILL | WONT) => FilterState::Option(byte),
                (FilterState::Command, SB) => FilterState::Subnegotiation,
                // NOP, GA and the other two-byte commands
                (FilterState::Command, _) => FilterState::Text,
                (FilterState::Option(verb), option) => {
                    match verb {
                        DO => out.replies.extend_from_slice(&[IAC, WONT, option]),
                        WILL => out.replies.extend_from_slice(&[IAC, DONT, option]),
                        _ => {}
                    }
                    FilterState::Text
                }
                (FilterState::Subnegotiation, IAC) => FilterState::SubnegotiationIac,
                (FilterState::Subnegotiation, _) => FilterState::Subnegotiation,
                (FilterState::SubnegotiationIac, SE) => FilterState::Text,
                (FilterState::SubnegotiationIac, _) => FilterState::Subnegotiation,
            };
        }

        out
    }
}

/// UTF-8 decoder that keeps a split character for the next chunk.
///
/// Invalid sequences are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, prefixed by whatever was left over last time.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        text
    }

    /// Whether bytes of an unfinished character are held back.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
