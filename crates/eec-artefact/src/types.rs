use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Deployment parameters passed to the orchestrator, keyed by input name.
pub type Params = Map<String, Value>;

/// Artefact as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawArtefact {
    /// Where the artefact was published; a `.csar` suffix marks a bundle
    #[serde(rename = "downloadUrl", default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    /// Base64 of the ADT YAML, or of the bundle archive
    #[serde(
        rename = "downloadUrl_content",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<String>,

    /// Already-parsed ADT supplied inline instead of `content`
    #[serde(rename = "deployment_adt", default, skip_serializing_if = "Option::is_none")]
    pub inline_adt: Option<Value>,
}

impl RawArtefact {
    #[must_use]
    pub fn is_bundle(&self) -> bool {
        self.download_url
            .as_deref()
            .is_some_and(|url| url.trim_end().ends_with(".csar"))
    }
}

/// Inputs accompanying a submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionInputs {
    /// Each entry contributes its keys as deployment parameters
    #[serde(default)]
    pub parameters: Vec<Params>,
}

/// What the orchestrator deploys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeploymentDescriptor {
    /// Structured ADT with the master node template already removed
    Inline { adt: Value },
    /// Packaged CSAR bundle
    Bundle { url: String, content: Option<String> },
}

/// Properties of the node that hosts the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeSpec(pub Map<String, Value>);

impl NodeSpec {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArtefact {
    pub descriptor: DeploymentDescriptor,
    pub node_spec: NodeSpec,
    pub params: Params,
    /// Application id requested through the `app_id` parameter
    pub app_id: Option<String>,
}

/// One declared topology input, as listed to clients before submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdtInput {
    pub key: String,
    pub description: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub default: Value,
}
