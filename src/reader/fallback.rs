use super::ReaderMode;

/// Last fallback notice sent, so the same `(mode, reason)` is announced once
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FallbackSignature(Option<(ReaderMode, Option<String>)>);

impl FallbackSignature {
    /// Records the signature, returns false when it matches the last one sent
    pub fn should_notify(&mut self, mode: ReaderMode, reason: Option<&str>) -> bool {
        let signature = (mode, reason.map(str::to_string));
        if self.0.as_ref() == Some(&signature) {
            return false;
        }

        self.0 = Some(signature);
        true
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}
