use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::duck::v1::{Addressable, KReference, Status};

/// Maps a custom domain name onto an addressable target.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "serving.example.dev",
    version = "v1alpha1",
    kind = "DomainMapping",
    derive = "Default",
    namespaced,
    shortname = "dm",
    doc = "DomainMapping binds a domain name to an addressable target",
    printcolumn = r#"{"name":"URL","jsonPath":".status.url","type":"string"}"#,
    printcolumn = r#"{"name":"Ready","jsonPath":".status.conditions[?(@.type==\"Ready\")].status","type":"string"}"#,
    printcolumn = r#"{"name":"Reason","jsonPath":".status.conditions[?(@.type==\"Ready\")].reason","type":"string"}"#,
    status = "DomainMappingStatus"
)]
pub struct DomainMappingSpec {
    /// Target the domain resolves to. The object name is the domain itself.
    #[serde(rename = "ref")]
    pub reference: KReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<SecretTls>,
}

/// Secret holding the certificate to serve the domain with.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretTls {
    pub secret_name: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainMappingStatus {
    #[serde(flatten)]
    pub status: Status,
    pub url: Option<String>,
    pub address: Option<Addressable>,
}
