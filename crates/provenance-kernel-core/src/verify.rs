//! Credential verification.
//!
//! Verification is a pure function over the credential JSON. It never
//! fails: every problem is reported as a failed [`Check`] and the report's
//! `valid` flag is the conjunction of all checks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::canonical_digest;
use crate::credential::{Credential, ProofPurpose, TOTAL_SHARES};
use crate::crypto::{Ed25519Signature, Sha256Hash};
use crate::error::CoreError;
use crate::types::Did;

pub const CHECK_STRUCTURE: &str = "structure";
pub const CHECK_CREATOR_SHARES: &str = "creator_shares";
pub const CHECK_DIGEST: &str = "digest";
pub const CHECK_SIGNATURE_ISSUER: &str = "signature_issuer";
pub const CHECK_SIGNATURE_SENTINEL: &str = "signature_sentinel";
pub const CHECK_SENTINEL_ATTESTATION: &str = "sentinel_attestation";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl Check {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub valid: bool,
    pub checks: Vec<Check>,
}

impl VerificationReport {
    fn from_checks(checks: Vec<Check>) -> Self {
        Self {
            valid: !checks.is_empty() && checks.iter().all(|c| c.passed),
            checks,
        }
    }

    pub fn check(&self, name: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Extra expectations a caller may place on a credential.
///
/// The default accepts an authentication proof from any key, which only
/// shows the credential is self-consistent. A service that knows its
/// platform sentinel should use [`VerifyOptions::pinned`].
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    /// Require the authentication proof to come from this sentinel.
    pub expected_sentinel: Option<Did>,
    /// Fail attestation when `expected_sentinel` is unset.
    pub require_known_sentinel: bool,
}

impl VerifyOptions {
    /// Attestation passes only for a proof by `sentinel`; with no sentinel
    /// known it always fails.
    pub fn pinned(sentinel: Option<Did>) -> Self {
        Self {
            expected_sentinel: sentinel,
            require_known_sentinel: true,
        }
    }
}

pub fn verify(credential: &Credential) -> VerificationReport {
    match serde_json::to_value(credential) {
        Ok(value) => verify_value(&value),
        Err(e) => VerificationReport::from_checks(vec![Check::fail(CHECK_STRUCTURE, e.to_string())]),
    }
}

pub fn verify_value(value: &Value) -> VerificationReport {
    verify_value_with(value, &VerifyOptions::default())
}

pub fn verify_value_with(value: &Value, options: &VerifyOptions) -> VerificationReport {
    let mut checks = Vec::new();

    let proofs = match structure(value) {
        Ok(proofs) => proofs,
        Err(detail) => return VerificationReport::from_checks(vec![Check::fail(CHECK_STRUCTURE, detail)]),
    };
    checks.push(Check::pass(CHECK_STRUCTURE, "required fields present"));

    let shares = creator_shares(&value["credentialSubject"]);
    let shares_ok = shares.passed;
    checks.push(shares);
    if !shares_ok {
        return VerificationReport::from_checks(checks);
    }

    let digest = match signing_digest(value) {
        Ok(digest) => digest,
        Err(e) => {
            checks.push(Check::fail(CHECK_DIGEST, e.to_string()));
            return VerificationReport::from_checks(checks);
        }
    };

    let issuer = value["issuer"].as_str().unwrap_or_default();
    let mut has_assertion = false;
    let mut has_authentication = false;
    let mut attested = false;
    for proof in &proofs {
        let purpose = proof["proofPurpose"].as_str().and_then(ProofPurpose::from_wire);
        let check = match purpose {
            Some(ProofPurpose::Assertion) => {
                has_assertion = true;
                signature_check(CHECK_SIGNATURE_ISSUER, proof, &digest, |did| {
                    (did.to_string() == issuer)
                        .then_some(())
                        .ok_or_else(|| format!("proof signed by {did}, not the issuer"))
                })
            }
            Some(ProofPurpose::Authentication) => {
                has_authentication = true;
                let check = signature_check(CHECK_SIGNATURE_SENTINEL, proof, &digest, |did| {
                    match &options.expected_sentinel {
                        Some(expected) if expected != did => {
                            Err(format!("proof signed by {did}, expected sentinel {expected}"))
                        }
                        None if options.require_known_sentinel => {
                            Err(format!("proof signed by {did}, no platform sentinel is known"))
                        }
                        _ => Ok(()),
                    }
                });
                attested |= check.passed;
                check
            }
            None => Check::fail(
                CHECK_STRUCTURE,
                format!("unknown proof purpose {}", proof["proofPurpose"]),
            ),
        };
        checks.push(check);
    }

    if !has_assertion {
        checks.push(Check::fail(CHECK_SIGNATURE_ISSUER, "no assertionMethod proof"));
    }
    checks.push(if attested {
        Check::pass(CHECK_SENTINEL_ATTESTATION, "authentication proof verified")
    } else if has_authentication {
        Check::fail(CHECK_SENTINEL_ATTESTATION, "authentication proof not verified")
    } else {
        Check::fail(CHECK_SENTINEL_ATTESTATION, "no authentication proof")
    });

    VerificationReport::from_checks(checks)
}

/// The proofs of a structurally complete credential.
fn structure(value: &Value) -> Result<Vec<Value>, String> {
    let Value::Object(map) = value else {
        return Err("credential is not a JSON object".into());
    };
    if !map.get("issuer").is_some_and(Value::is_string) {
        return Err("missing issuer".into());
    }
    if !map.get("credentialSubject").is_some_and(Value::is_object) {
        return Err("missing credentialSubject".into());
    }
    let proofs = match map.get("proof") {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::Object(_)) => vec![single.clone()],
        _ => Vec::new(),
    };
    if proofs.is_empty() {
        return Err("missing proof".into());
    }
    Ok(proofs)
}

fn creator_shares(subject: &Value) -> Check {
    let Some(creators) = subject["creators"].as_array().filter(|c| !c.is_empty()) else {
        return Check::fail(CHECK_CREATOR_SHARES, "no creators");
    };
    let mut sum: u64 = 0;
    for creator in creators {
        let share = match creator.get("share") {
            None | Some(Value::Null) => 0,
            Some(v) => match v.as_u64() {
                Some(s) => s,
                None => return Check::fail(CHECK_CREATOR_SHARES, format!("invalid share {v}")),
            },
        };
        sum = sum.saturating_add(share);
    }
    if sum == TOTAL_SHARES {
        Check::pass(CHECK_CREATOR_SHARES, "shares sum to 100")
    } else {
        Check::fail(CHECK_CREATOR_SHARES, format!("shares sum to {sum}"))
    }
}

fn signing_digest(value: &Value) -> Result<Sha256Hash, CoreError> {
    let mut unsigned = value.clone();
    if let Value::Object(map) = &mut unsigned {
        map.remove("proof");
    }
    canonical_digest(&unsigned)
}

fn signature_check<F>(name: &str, proof: &Value, digest: &Sha256Hash, signer_ok: F) -> Check
where
    F: FnOnce(&Did) -> Result<(), String>,
{
    let Some(method) = proof["verificationMethod"].as_str() else {
        return Check::fail(name, "missing verificationMethod");
    };
    let did = match Did::parse_reference(method) {
        Ok((did, _)) => did,
        Err(e) => return Check::fail(name, e.to_string()),
    };
    if let Err(detail) = signer_ok(&did) {
        return Check::fail(name, detail);
    }
    let signature = match proof["proofValue"].as_str().map(Ed25519Signature::from_hex) {
        Some(Ok(sig)) => sig,
        Some(Err(e)) => return Check::fail(name, e.to_string()),
        None => return Check::fail(name, "missing proofValue"),
    };
    match did.public_key().verify(digest.as_bytes(), &signature) {
        Ok(()) => Check::pass(name, format!("verified with {method}")),
        Err(e) => Check::fail(name, e.to_string()),
    }
}
