use std::sync::LazyLock;

use kube::{Resource, core::GroupVersionKind};

use super::{DomainMapping, DomainMappingStatus};
use crate::apis::{
    CONDITION_READY, Condition, ConditionManager, ConditionSet, ConditionSeverity,
    ConditionStatus, StatusAccessor,
};
use crate::duck::v1::Addressable;

pub const DOMAIN_MAPPING_CONDITION_READY: &str = CONDITION_READY;
/// The ingress serving the domain is reconciled and ready.
pub const DOMAIN_MAPPING_CONDITION_INGRESS_READY: &str = "IngressReady";
/// The cluster-wide claim on the domain name is held by this mapping.
pub const DOMAIN_MAPPING_CONDITION_DOMAIN_CLAIMED: &str = "DomainClaimed";
/// The `ref` target exists and is addressable.
pub const DOMAIN_MAPPING_CONDITION_REFERENCE_RESOLVED: &str = "ReferenceResolved";
pub const DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED: &str = "CertificateProvisioned";

static DOMAIN_MAPPING_CONDITION_SET: LazyLock<ConditionSet> = LazyLock::new(|| {
    ConditionSet::living([
        DOMAIN_MAPPING_CONDITION_INGRESS_READY,
        DOMAIN_MAPPING_CONDITION_DOMAIN_CLAIMED,
        DOMAIN_MAPPING_CONDITION_REFERENCE_RESOLVED,
        DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED,
    ])
});

impl DomainMapping {
    pub fn condition_set(&self) -> &'static ConditionSet {
        &DOMAIN_MAPPING_CONDITION_SET
    }

    pub fn group_version_kind(&self) -> GroupVersionKind {
        GroupVersionKind::gvk(&Self::group(&()), &Self::version(&()), &Self::kind(&()))
    }

    pub fn status_or_default(&mut self) -> &mut DomainMappingStatus {
        self.status.get_or_insert_with(DomainMappingStatus::default)
    }

    /// Ready and computed against the current spec generation.
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| {
            s.is_current(self.metadata.generation) && s.ready_condition().is_some_and(Condition::is_true)
        })
    }

    pub fn is_failed(&self) -> bool {
        self.status
            .as_ref()
            .and_then(DomainMappingStatus::ready_condition)
            .is_some_and(Condition::is_false)
    }
}

impl StatusAccessor for DomainMappingStatus {
    fn conditions(&self) -> &[Condition] {
        self.status.conditions()
    }
    fn set_conditions(&mut self, conditions: Vec<Condition>) {
        self.status.set_conditions(conditions);
    }
    fn observed_generation(&self) -> i64 {
        self.status.observed_generation()
    }
    fn set_observed_generation(&mut self, generation: i64) {
        self.status.set_observed_generation(generation);
    }
}

impl DomainMappingStatus {
    fn manage(&mut self) -> ConditionManager<'_, Self> {
        DOMAIN_MAPPING_CONDITION_SET.manage(self)
    }

    pub fn ready_condition(&self) -> Option<&Condition> {
        self.conditions()
            .iter()
            .find(|c| c.type_ == DOMAIN_MAPPING_CONDITION_READY)
    }

    pub fn initialize_conditions(&mut self) {
        self.manage().initialize_conditions();
    }

    pub fn set_url(&mut self, url: Option<String>) {
        self.address = url.as_ref().map(|u| Addressable {
            name: None,
            url: Some(u.clone()),
        });
        self.url = url;
    }

    pub fn mark_ingress_not_configured(&mut self) {
        self.manage().mark_unknown(
            DOMAIN_MAPPING_CONDITION_INGRESS_READY,
            "IngressNotConfigured",
            "Ingress has not yet been reconciled.",
        );
    }

    /// Mirror the readiness of the ingress serving this domain.
    pub fn propagate_ingress_readiness(&mut self, ingress_ready: Option<&Condition>) {
        let mut mgr = self.manage();
        match ingress_ready {
            None => mgr.mark_unknown(
                DOMAIN_MAPPING_CONDITION_INGRESS_READY,
                "IngressNotConfigured",
                "Ingress has not yet been reconciled.",
            ),
            Some(cond) => match cond.status {
                ConditionStatus::True => mgr.mark_true(DOMAIN_MAPPING_CONDITION_INGRESS_READY),
                ConditionStatus::False => mgr.mark_false(
                    DOMAIN_MAPPING_CONDITION_INGRESS_READY,
                    ConditionSeverity::Error,
                    cond.reason.clone(),
                    cond.message.clone(),
                ),
                ConditionStatus::Unknown => mgr.mark_unknown(
                    DOMAIN_MAPPING_CONDITION_INGRESS_READY,
                    cond.reason.clone(),
                    cond.message.clone(),
                ),
            },
        }
    }

    pub fn mark_tls_not_enabled(&mut self, message: &str) {
        self.manage().mark_true_with_reason(
            DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED,
            "TLSNotEnabled",
            message,
        );
    }

    pub fn mark_certificate_ready(&mut self) {
        self.manage()
            .mark_true(DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED);
    }

    pub fn mark_certificate_not_ready(&mut self, name: &str) {
        self.manage().mark_unknown(
            DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED,
            "CertificateNotReady",
            format!("Certificate {name} is not ready."),
        );
    }

    pub fn mark_certificate_not_owned(&mut self, name: &str) {
        self.manage().mark_false(
            DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED,
            ConditionSeverity::Error,
            "CertificateNotOwned",
            format!("There is an existing certificate {name} that we don't own."),
        );
    }

    pub fn mark_certificate_provision_failed(&mut self, name: &str) {
        self.manage().mark_false(
            DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED,
            ConditionSeverity::Error,
            "CertificateProvisionFailed",
            format!("Certificate {name} failed to be provisioned."),
        );
    }

    /// Serve over plain HTTP until the certificate is ready.
    pub fn mark_http_downgrade(&mut self, name: &str) {
        self.manage().mark_true_with_reason(
            DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED,
            "HTTPDowngrade",
            format!("Certificate {name} is not ready downgrade HTTP."),
        );
    }

    pub fn mark_domain_claimed(&mut self) {
        self.manage().mark_true(DOMAIN_MAPPING_CONDITION_DOMAIN_CLAIMED);
    }

    pub fn mark_domain_claim_not_owned(&mut self) {
        self.manage().mark_false(
            DOMAIN_MAPPING_CONDITION_DOMAIN_CLAIMED,
            ConditionSeverity::Error,
            "DomainAlreadyClaimed",
            "The domain name is already in use by another DomainMapping",
        );
    }

    pub fn mark_domain_claim_failed(&mut self, reason: &str) {
        self.manage().mark_false(
            DOMAIN_MAPPING_CONDITION_DOMAIN_CLAIMED,
            ConditionSeverity::Error,
            "DomainClaimFailed",
            reason,
        );
    }

    pub fn mark_reference_resolved(&mut self) {
        self.manage()
            .mark_true(DOMAIN_MAPPING_CONDITION_REFERENCE_RESOLVED);
    }

    pub fn mark_reference_not_resolved(&mut self, reason: &str) {
        self.manage().mark_false(
            DOMAIN_MAPPING_CONDITION_REFERENCE_RESOLVED,
            ConditionSeverity::Error,
            "ResolveFailed",
            reason,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serving::v1alpha1::DomainMappingSpec;

    fn ready_status() -> DomainMappingStatus {
        let mut status = DomainMappingStatus::default();
        status.initialize_conditions();
        status.mark_domain_claimed();
        status.mark_reference_resolved();
        status.mark_certificate_ready();
        status.propagate_ingress_readiness(Some(&Condition::new("Ready", ConditionStatus::True)));
        status
    }

    fn status_of(status: &DomainMappingStatus, type_: &str) -> ConditionStatus {
        status
            .conditions()
            .iter()
            .find(|c| c.type_ == type_)
            .map(|c| c.status)
            .unwrap_or_default()
    }

    #[test]
    fn condition_set_top_level_is_ready() {
        let dm = DomainMapping::default();
        assert_eq!(dm.condition_set().happy_type().as_str(), CONDITION_READY);
        assert_eq!(dm.condition_set().dependents().len(), 4);
    }

    #[test]
    fn initialize_leaves_everything_unknown() {
        let mut status = DomainMappingStatus::default();
        status.initialize_conditions();
        for type_ in [
            DOMAIN_MAPPING_CONDITION_READY,
            DOMAIN_MAPPING_CONDITION_INGRESS_READY,
            DOMAIN_MAPPING_CONDITION_DOMAIN_CLAIMED,
            DOMAIN_MAPPING_CONDITION_REFERENCE_RESOLVED,
            DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED,
        ] {
            assert_eq!(status_of(&status, type_), ConditionStatus::Unknown, "{type_}");
        }
    }

    #[test]
    fn happy_path_is_ready() {
        let status = ready_status();
        assert_eq!(status_of(&status, CONDITION_READY), ConditionStatus::True);
    }

    #[test]
    fn tls_not_enabled_still_ready() {
        let mut status = DomainMappingStatus::default();
        status.mark_domain_claimed();
        status.mark_reference_resolved();
        status.propagate_ingress_readiness(Some(&Condition::new("Ready", ConditionStatus::True)));
        status.mark_tls_not_enabled("AutoTLS is disabled");
        assert_eq!(status_of(&status, CONDITION_READY), ConditionStatus::True);
        let cert = status
            .conditions()
            .iter()
            .find(|c| c.type_ == DOMAIN_MAPPING_CONDITION_CERTIFICATE_PROVISIONED)
            .unwrap();
        assert_eq!(cert.reason, "TLSNotEnabled");
    }

    #[test]
    fn domain_claim_not_owned_fails_ready() {
        let mut status = ready_status();
        status.mark_domain_claim_not_owned();
        let ready = status.ready_condition().unwrap();
        assert!(ready.is_false());
        assert_eq!(ready.reason, "DomainAlreadyClaimed");
    }

    #[test]
    fn certificate_not_ready_goes_unknown() {
        let mut status = ready_status();
        status.mark_certificate_not_ready("cert");
        let ready = status.ready_condition().unwrap();
        assert!(ready.is_unknown());
        assert_eq!(ready.message, "Certificate cert is not ready.");

        status.mark_http_downgrade("cert");
        assert!(status.ready_condition().unwrap().is_true());
    }

    #[test]
    fn certificate_recovery_restores_ready() {
        let mut status = ready_status();
        status.mark_certificate_provision_failed("cert");
        assert!(status.ready_condition().unwrap().is_false());
        status.mark_certificate_ready();
        assert!(status.ready_condition().unwrap().is_true());
    }

    #[test]
    fn reference_failure_wins_over_certificate_unknown() {
        let mut status = ready_status();
        status.mark_certificate_not_ready("cert");
        status.mark_reference_not_resolved("service \"missing\" not found");
        let ready = status.ready_condition().unwrap();
        assert!(ready.is_false());
        assert_eq!(ready.reason, "ResolveFailed");
    }

    #[test]
    fn certificate_failures_are_errors() {
        let mut status = ready_status();
        status.mark_certificate_not_owned("cert");
        assert_eq!(status.ready_condition().unwrap().reason, "CertificateNotOwned");
        status.mark_certificate_provision_failed("cert");
        assert_eq!(
            status.ready_condition().unwrap().reason,
            "CertificateProvisionFailed"
        );
        status.mark_domain_claim_failed("conflict");
        // DomainClaimed comes before CertificateProvisioned in the set
        assert_eq!(status.ready_condition().unwrap().reason, "DomainClaimFailed");
    }

    #[test]
    fn ingress_propagation() {
        let mut status = ready_status();
        status.propagate_ingress_readiness(Some(
            &Condition::new("Ready", ConditionStatus::False).with_reason("LoadBalancerFailed", "lb down"),
        ));
        let ready = status.ready_condition().unwrap();
        assert!(ready.is_false());
        assert_eq!(ready.reason, "LoadBalancerFailed");

        status.propagate_ingress_readiness(None);
        let ready = status.ready_condition().unwrap();
        assert!(ready.is_unknown());
        assert_eq!(ready.reason, "IngressNotConfigured");

        status.mark_ingress_not_configured();
        assert_eq!(
            status_of(&status, DOMAIN_MAPPING_CONDITION_INGRESS_READY),
            ConditionStatus::Unknown
        );
    }

    #[test]
    fn is_ready_requires_current_generation() {
        let mut dm = DomainMapping::new("example.com", DomainMappingSpec::default());
        dm.metadata.generation = Some(2);
        assert!(!dm.is_ready());

        *dm.status_or_default() = ready_status();
        assert!(!dm.is_ready(), "status observed generation 0 is stale");

        dm.status_or_default().observe(Some(2));
        assert!(dm.is_ready());
        assert!(!dm.is_failed());

        dm.status_or_default().mark_reference_not_resolved("gone");
        assert!(!dm.is_ready());
        assert!(dm.is_failed());
    }

    #[test]
    fn set_url_fills_address() {
        let mut status = DomainMappingStatus::default();
        status.set_url(Some("https://example.com".into()));
        assert_eq!(
            status.address.as_ref().and_then(|a| a.url.as_deref()),
            Some("https://example.com")
        );
        status.set_url(None);
        assert!(status.address.is_none());
    }
}
