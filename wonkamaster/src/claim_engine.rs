//! Claim issuance and resolution.

use std::sync::Arc;

use tracing::{info, warn};
use wonka::constants::result;
use wonka::{
    Claim, ClaimRequest, ClaimResponse, EVERYONE, ResolveRequest, is_personnel_name, unix_i64,
};
use wonka_directory::{EntityStore, GroupDirectory};

use crate::auth::{
    AuthContext, Caller, CallerClass, authenticate_claim_request, authenticate_resolve_request,
};
use crate::claims::compute_approved_claims;
use crate::clock::Clock;
use crate::config::PolicyConfig;
use crate::error::AuthError;
use crate::issuer::{ClaimProtocol, Issuer};
use crate::ssh::SshTrust;

/// How far before now a resolved claim becomes valid, in seconds.
pub const RESOLVE_BACKDATE_SECS: i64 = 5 * 60;

/// Authenticates claim requests and issues claim tokens.
pub struct ClaimEngine {
    config: Arc<PolicyConfig>,
    store: Arc<dyn EntityStore>,
    directory: Arc<dyn GroupDirectory>,
    ssh: Arc<dyn SshTrust>,
    clock: Arc<dyn Clock>,
    issuer: Issuer,
}

impl ClaimEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new(
        config: Arc<PolicyConfig>,
        store: Arc<dyn EntityStore>,
        directory: Arc<dyn GroupDirectory>,
        ssh: Arc<dyn SshTrust>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let issuer = Issuer::new(config.authority().clone());
        Self {
            config,
            store,
            directory,
            ssh,
            clock,
            issuer,
        }
    }

    fn context(&self, now: i64) -> AuthContext<'_> {
        AuthContext {
            config: &*self.config,
            store: &*self.store,
            ssh: &*self.ssh,
            now,
        }
    }

    /// Issues a claim token for the request.
    ///
    /// # Errors
    ///
    /// Returns `Rejected` if authentication fails, `InvalidImpersonator`,
    /// `OutsideTimeWindow` or `Expired` for policy violations, `NoAccess`
    /// if nothing requested may be granted, and `Lookup` or `Signing` for
    /// server-side failures.
    pub fn claim(
        &self,
        req: &ClaimRequest,
        protocol: ClaimProtocol,
    ) -> Result<ClaimResponse, AuthError> {
        self.claim_inner(req, protocol).inspect_err(|e| {
            warn!(
                entity = %req.entity_name,
                result = e.result_code(),
                status_code = e.status(),
                error = %e,
                "claim request rejected"
            );
        })
    }

    fn claim_inner(
        &self,
        req: &ClaimRequest,
        protocol: ClaimProtocol,
    ) -> Result<ClaimResponse, AuthError> {
        let now = self.clock.now();
        let caller = authenticate_claim_request(req, &self.context(now))?;
        let (requester, class) = self.effective_requester(&caller, &req.impersonated_entity)?;

        let etime = match caller.ssh_valid_before {
            Some(valid_before) if req.etime == 0 => unix_i64(valid_before),
            _ => req.etime,
        };
        let valid_before = self.config.claim_window().apply(req.ctime, etime, now)?;

        let destination = if req.destination.is_empty() {
            requester.as_str()
        } else {
            req.destination.as_str()
        };
        let approved = compute_approved_claims(&req.claim, &requester, class, &*self.directory)?;

        let claim = Claim::new(&requester, &approved, destination, req.ctime, valid_before);
        let token = self.issuer.issue(claim, protocol, &caller.public_key)?;
        info!(
            entity = %requester,
            authtype = %caller.auth,
            destination = %destination,
            approved_claims = %approved,
            "claim issued"
        );
        Ok(ClaimResponse {
            result: result::OK.to_string(),
            token,
        })
    }

    /// Applies impersonation. Returns the name the claim is issued to and
    /// the class its grants are computed for.
    fn effective_requester(
        &self,
        caller: &Caller,
        impersonated: &str,
    ) -> Result<(String, CallerClass), AuthError> {
        if impersonated.is_empty() {
            return Ok((caller.name.clone(), caller.class));
        }
        if !self.config.is_impersonator(&caller.name)
            || caller.name.eq_ignore_ascii_case(impersonated)
        {
            return Err(AuthError::InvalidImpersonator {
                caller: caller.name.clone(),
                target: impersonated.to_string(),
            });
        }
        let class = if is_personnel_name(impersonated) {
            CallerClass::User
        } else {
            CallerClass::Service
        };
        info!(
            caller = %caller.name,
            impersonated = impersonated,
            "impersonating"
        );
        Ok((impersonated.to_string(), class))
    }

    /// Issues a sealed claim towards `requested_entity`, folding in the
    /// capabilities that destination requires.
    ///
    /// # Errors
    ///
    /// Returns `VerifyFailed` if authentication fails, `Expired` if the
    /// requested expire time has passed, `NoAccess` if nothing may be
    /// granted, and `Lookup` or `Signing` for server-side failures.
    pub fn resolve(&self, req: &ResolveRequest) -> Result<ClaimResponse, AuthError> {
        self.resolve_inner(req).inspect_err(|e| {
            warn!(
                entity = %req.entity_name,
                destination = %req.requested_entity,
                result = e.result_code(),
                status_code = e.status(),
                error = %e,
                "resolve request rejected"
            );
        })
    }

    fn resolve_inner(&self, req: &ResolveRequest) -> Result<ClaimResponse, AuthError> {
        let now = self.clock.now();
        let caller = authenticate_resolve_request(req, &self.context(now))?;

        let mut requested = vec![EVERYONE.to_string(), caller.name.clone()];
        requested.extend(
            req.claims
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from),
        );
        match self.store.get(&req.requested_entity) {
            Ok(destination) => {
                requested.extend(destination.required_claims().map(String::from));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(AuthError::lookup(e)),
        }

        let window = self.config.resolve_window();
        let etime = if req.etime == 0 {
            now.saturating_add(self.config.resolve_default_lifetime())
        } else {
            req.etime
        };
        window.check_expiry(etime, now)?;
        let valid_before = window.cap(etime, now);

        let approved = compute_approved_claims(
            &requested.join(","),
            &caller.name,
            caller.class,
            &*self.directory,
        )?;
        let claim = Claim::new(
            &caller.name,
            &approved,
            &req.requested_entity,
            now.saturating_sub(RESOLVE_BACKDATE_SECS),
            valid_before,
        );
        let token = self
            .issuer
            .issue(claim, ClaimProtocol::V2, &caller.public_key)?;
        info!(
            entity = %caller.name,
            authtype = %caller.auth,
            destination = %req.requested_entity,
            approved_claims = %approved,
            "claim resolved"
        );
        Ok(ClaimResponse {
            result: result::OK.to_string(),
            token,
        })
    }
}
