//! What to do with signatures already present when an RRset is re-signed.

use crate::dns::resource::DNSResource;

/// Outcome of a retention policy for one existing signature.
///
/// The policy is called with `None` once for an RRset that has no
/// signatures; the `NoAdd` outcomes then stop every key from signing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAction {
    /// Keep the signature and sign again with its key
    KeepAndAddNew,
    /// Keep the signature; its key does not sign this RRset again
    KeepNoAdd,
    /// Drop the signature and sign again with its key
    RemoveAndAddNew,
    /// Drop the signature; its key does not sign this RRset again
    RemoveNoAdd,
}

impl SignatureAction {
    pub fn keeps(&self) -> bool {
        matches!(self, Self::KeepAndAddNew | Self::KeepNoAdd)
    }

    pub fn adds_new(&self) -> bool {
        matches!(self, Self::KeepAndAddNew | Self::RemoveAndAddNew)
    }
}

/// Throw away every old signature
pub fn replace_all(_existing: Option<&DNSResource>) -> SignatureAction {
    SignatureAction::RemoveAndAddNew
}

/// Keep every old signature and add new ones next to them
pub fn keep_all(_existing: Option<&DNSResource>) -> SignatureAction {
    SignatureAction::KeepAndAddNew
}

/// Keep signatures valid at `now` without re-signing with their key;
/// replace the rest
pub fn keep_valid(now: u32) -> impl FnMut(Option<&DNSResource>) -> SignatureAction {
    move |existing| match existing.and_then(|rr| rr.as_rrsig()) {
        Some(sig) if sig.is_current(now) => SignatureAction::KeepNoAdd,
        Some(_) => SignatureAction::RemoveAndAddNew,
        None => SignatureAction::KeepAndAddNew,
    }
}
