use serde::de::{Deserialize, Deserializer};
use serde::{Serialize, Serializer};
use std::fmt;

/// The kind of sensitive value being carried. Determines the mask literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Generic,
    Password,
    Token,
    Key,
    Certificate,
}

impl SecretKind {
    fn mask_literal(self) -> &'static str {
        match self {
            SecretKind::Generic => "[REDACTED]",
            SecretKind::Password => "[PASSWORD]",
            SecretKind::Token => "[TOKEN]",
            SecretKind::Key => "[KEY]",
            SecretKind::Certificate => "[CERTIFICATE]",
        }
    }
}

/// The strategy used to obscure the payload at rest. Surfaced to the
/// logging pipeline's `Maskable` contract for diagnostics; never changes
/// what gets logged (always the mask literal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskStrategy {
    /// The value is the empty string; nothing to obscure.
    Empty,
    /// The payload is XOR-obscured at rest and reconstructed on `reveal`.
    XorObscured,
}

/// Anything the logging pipeline should substitute with a masked literal
/// before a record reaches the underlying logger (`spec.md` §4.7).
pub trait Maskable {
    fn should_mask(&self) -> bool {
        true
    }
    fn masked_value(&self) -> String;
    fn mask_strategy(&self) -> MaskStrategy;
}

/// A sensitive string that never yields its payload through `Display`,
/// `Debug`, or `Serialize`. The only way to recover the payload is
/// [`SecretValue::reveal`].
///
/// The payload is stored XOR-obscured against a random key generated at
/// construction time, so the plaintext never sits contiguously in the
/// struct's memory layout between construction and `reveal`/`destroy`.
/// This is not cryptographic protection — anyone with the key (carried
/// alongside the ciphertext) can recover the value — it exists solely so a
/// naive memory scrape of the struct doesn't hand over the payload for
/// free.
#[derive(Clone)]
pub struct SecretValue {
    kind: SecretKind,
    empty: bool,
    ciphertext: Vec<u8>,
    key: Vec<u8>,
}

fn xor_key(len: usize) -> Vec<u8> {
    use std::time::{SystemTime, UNIX_EPOCH};
    // Not a CSPRNG: this is obfuscation, not encryption (see struct docs).
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0) as u64
        ^ (len as u64).wrapping_mul(0x9E3779B97F4A7C15);
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state & 0xFF) as u8
        })
        .collect()
}

fn xor(data: &[u8], key: &[u8]) -> Vec<u8> {
    data.iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect()
}

impl SecretValue {
    fn new(kind: SecretKind, plaintext: &str) -> Self {
        if plaintext.is_empty() {
            return Self {
                kind,
                empty: true,
                ciphertext: Vec::new(),
                key: Vec::new(),
            };
        }
        let key = xor_key(plaintext.len().max(8));
        let ciphertext = xor(plaintext.as_bytes(), &key);
        Self {
            kind,
            empty: false,
            ciphertext,
            key,
        }
    }

    pub fn new_generic(plaintext: impl AsRef<str>) -> Self {
        Self::new(SecretKind::Generic, plaintext.as_ref())
    }

    pub fn new_password(plaintext: impl AsRef<str>) -> Self {
        Self::new(SecretKind::Password, plaintext.as_ref())
    }

    pub fn new_token(plaintext: impl AsRef<str>) -> Self {
        Self::new(SecretKind::Token, plaintext.as_ref())
    }

    pub fn new_key(plaintext: impl AsRef<str>) -> Self {
        Self::new(SecretKind::Key, plaintext.as_ref())
    }

    pub fn new_certificate(plaintext: impl AsRef<str>) -> Self {
        Self::new(SecretKind::Certificate, plaintext.as_ref())
    }

    /// The only path that returns the payload. Callers must minimize the
    /// scope of the returned value.
    pub fn reveal(&self) -> String {
        if self.empty {
            return String::new();
        }
        let bytes = xor(&self.ciphertext, &self.key);
        String::from_utf8(bytes).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn kind(&self) -> SecretKind {
        self.kind
    }

    /// Constant-time comparison: no short-circuit on first-differing byte.
    pub fn equals(&self, other: &SecretValue) -> bool {
        self.equals_string(&other.reveal())
    }

    /// Constant-time comparison against a plaintext string.
    pub fn equals_string(&self, s: &str) -> bool {
        let a = self.reveal();
        let a = a.as_bytes();
        let b = s.as_bytes();
        let mut diff = (a.len() ^ b.len()) as u8;
        let n = a.len().max(b.len());
        for i in 0..n {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            diff |= x ^ y;
        }
        diff == 0
    }

    /// Zero the in-memory representation. Best-effort: Rust does not
    /// guarantee the compiler won't have left copies elsewhere, so callers
    /// that need a guaranteed wipe must call this deterministically as soon
    /// as the secret is no longer needed.
    pub fn destroy(&mut self) {
        for b in self.ciphertext.iter_mut() {
            *b = 0;
        }
        for b in self.key.iter_mut() {
            *b = 0;
        }
        self.ciphertext.clear();
        self.key.clear();
        self.empty = true;
    }

    fn mask_literal(&self) -> &'static str {
        if self.empty {
            "[EMPTY]"
        } else {
            self.kind.mask_literal()
        }
    }
}

impl Maskable for SecretValue {
    fn masked_value(&self) -> String {
        self.mask_literal().to_string()
    }

    fn mask_strategy(&self) -> MaskStrategy {
        if self.empty {
            MaskStrategy::Empty
        } else {
            MaskStrategy::XorObscured
        }
    }
}

impl fmt::Display for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mask_literal())
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("kind", &self.kind)
            .field("value", &self.mask_literal())
            .finish()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.mask_literal())
    }
}

/// Always yields an empty secret: the serialized form is a mask literal,
/// never the payload, so there is nothing to reconstruct. Decoding a value
/// that was previously serialized can only recover emptiness, by design.
impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let _ = String::deserialize(deserializer)?;
        Ok(SecretValue::new(SecretKind::Generic, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_round_trips() {
        let s = SecretValue::new_password("hunter2");
        assert_eq!(s.reveal(), "hunter2");
    }

    #[test]
    fn empty_input_yields_empty_secret() {
        let s = SecretValue::new_token("");
        assert!(s.is_empty());
        assert_eq!(format!("{s}"), "[EMPTY]");
    }

    #[test]
    fn formatting_never_leaks_payload() {
        let s = SecretValue::new_password("hunter2");
        assert_eq!(format!("{s}"), "[PASSWORD]");
        assert_eq!(format!("{s:?}").contains("hunter2"), false);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "\"[PASSWORD]\"");
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn equals_string_is_sound() {
        let s = SecretValue::new_generic("abc123");
        assert!(s.equals_string("abc123"));
        assert!(!s.equals_string("abc124"));
        assert!(!s.equals_string("abc1234"));
    }

    #[test]
    fn destroy_zeroes_and_becomes_empty() {
        let mut s = SecretValue::new_key("k-123");
        s.destroy();
        assert!(s.is_empty());
        assert_eq!(s.reveal(), "");
    }

    #[test]
    fn clone_still_reveals_same_payload() {
        let s = SecretValue::new_certificate("cert-data");
        let c = s.clone();
        assert_eq!(s.reveal(), c.reveal());
    }

    #[test]
    fn serialize_then_deserialize_yields_empty_secret() {
        let s = SecretValue::new_password("hunter2");
        let json = serde_json::to_string(&s).unwrap();
        let round_tripped: SecretValue = serde_json::from_str(&json).unwrap();
        assert!(round_tripped.is_empty());
        assert_eq!(round_tripped.reveal(), "");
    }
}
