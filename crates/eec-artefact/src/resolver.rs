use std::io::{Cursor, Read};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use zip::ZipArchive;

use eec_config::InfrastructureConfig;
use eec_utils::error::ArtefactError;

use crate::types::{
    AdtInput, DeploymentDescriptor, NodeSpec, Params, RawArtefact, ResolvedArtefact,
    SubmissionInputs,
};

/// TOSCA versions an ADT may declare
pub const SUPPORTED_TOSCA_VERSIONS: &[&str] = &["tosca_simple_yaml_1_0", "tosca_simple_yaml_1_2"];

/// Parameter naming the application id instead of a deployment input
pub const APP_ID_PARAM: &str = "app_id";

/// Topology inputs with this prefix are platform-provided and never listed
const PLATFORM_INPUT_PREFIX: &str = "EMG_";

/// Turns raw submission input into what the lifecycle needs to provision and
/// deploy.
///
/// Resolution never has side effects, so every failure is a malformed-input
/// error that can be reported without cleanup.
pub trait ArtefactResolver: Send + Sync {
    /// Cheap envelope validation run synchronously at submission time.
    fn check(&self, artefact: &RawArtefact) -> Result<(), ArtefactError>;

    /// Full resolution, run by the lifecycle worker.
    fn resolve(
        &self,
        artefact: &RawArtefact,
        inputs: &SubmissionInputs,
    ) -> Result<ResolvedArtefact, ArtefactError>;

    /// Inputs the artefact declares, for clients preparing a submission.
    fn inputs(&self, artefact: &RawArtefact) -> Result<Vec<AdtInput>, ArtefactError>;
}

/// Resolver for TOSCA application description templates.
#[derive(Debug, Clone)]
pub struct ToscaResolver {
    master_node_template: String,
    default_node_spec: Utf8PathBuf,
}

impl ToscaResolver {
    #[must_use]
    pub fn new(
        master_node_template: impl Into<String>,
        default_node_spec: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            master_node_template: master_node_template.into(),
            default_node_spec: default_node_spec.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &InfrastructureConfig) -> Self {
        Self::new(
            config.master_node_template.clone(),
            config.default_node_spec.clone(),
        )
    }

    /// Parse the ADT carried by a non-bundle artefact.
    fn load_adt(artefact: &RawArtefact) -> Result<Value, ArtefactError> {
        if let Some(adt) = &artefact.inline_adt {
            return Ok(adt.clone());
        }
        let content = artefact
            .content
            .as_deref()
            .ok_or_else(|| ArtefactError::MissingField {
                field: "downloadUrl_content".to_string(),
            })?;
        decode_yaml(content)
    }

    /// Node spec from the master node template, which is removed from the
    /// topology, or else from the default node spec file.
    fn take_node_spec(&self, adt: &mut Value) -> Result<NodeSpec, ArtefactError> {
        let master = adt
            .get_mut("topology_template")
            .and_then(|t| t.get_mut("node_templates"))
            .and_then(Value::as_object_mut)
            .and_then(|templates| templates.remove(&self.master_node_template));

        let properties = master.and_then(|mut node| node.get_mut("properties").map(Value::take));
        if let Some(Value::Object(properties)) = properties {
            return Ok(NodeSpec(properties));
        }

        tracing::debug!(
            path = %self.default_node_spec,
            "Topology declares no master node; using default node spec"
        );
        load_default_node_spec(&self.default_node_spec)
    }
}

impl ArtefactResolver for ToscaResolver {
    fn check(&self, artefact: &RawArtefact) -> Result<(), ArtefactError> {
        if artefact.is_bundle() {
            if let Some(content) = &artefact.content {
                decode_base64(content)?;
            }
            return Ok(());
        }
        let adt = Self::load_adt(artefact)?;
        if !adt.is_object() {
            return Err(ArtefactError::Decode {
                reason: "ADT must be a YAML mapping".to_string(),
            });
        }
        Ok(())
    }

    fn resolve(
        &self,
        artefact: &RawArtefact,
        inputs: &SubmissionInputs,
    ) -> Result<ResolvedArtefact, ArtefactError> {
        if artefact.is_bundle() {
            let declared = artefact
                .content
                .as_deref()
                .map(bundle_inputs)
                .transpose()?;
            let (params, app_id) = collect_params(inputs, declared.as_deref());
            let url = artefact.download_url.clone().unwrap_or_default();
            let node_spec = load_default_node_spec(&self.default_node_spec)?;
            return Ok(ResolvedArtefact {
                descriptor: DeploymentDescriptor::Bundle {
                    url,
                    content: artefact.content.clone(),
                },
                node_spec,
                params,
                app_id,
            });
        }

        let mut adt = Self::load_adt(artefact)?;
        validate_adt(&adt)?;
        let declared = adt_inputs(&adt);
        let (params, app_id) = collect_params(inputs, Some(declared.as_slice()));
        let node_spec = self.take_node_spec(&mut adt)?;
        Ok(ResolvedArtefact {
            descriptor: DeploymentDescriptor::Inline { adt },
            node_spec,
            params,
            app_id,
        })
    }

    fn inputs(&self, artefact: &RawArtefact) -> Result<Vec<AdtInput>, ArtefactError> {
        if artefact.is_bundle() {
            let content = artefact
                .content
                .as_deref()
                .ok_or_else(|| ArtefactError::MissingField {
                    field: "downloadUrl_content".to_string(),
                })?;
            return bundle_inputs(content);
        }
        let adt = Self::load_adt(artefact)?;
        validate_adt(&adt)?;
        Ok(adt_inputs(&adt))
    }
}

fn bundle_inputs(content: &str) -> Result<Vec<AdtInput>, ArtefactError> {
    csar_inputs(&decode_base64(content)?)
}

fn decode_base64(content: &str) -> Result<Vec<u8>, ArtefactError> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ArtefactError::Decode {
            reason: format!("content is not base64: {e}"),
        })
}

fn decode_yaml(content: &str) -> Result<Value, ArtefactError> {
    let bytes = decode_base64(content)?;
    let text = String::from_utf8(bytes).map_err(|e| ArtefactError::Decode {
        reason: format!("content is not UTF-8: {e}"),
    })?;
    serde_yaml::from_str(&text).map_err(|e| ArtefactError::Decode {
        reason: format!("content is not YAML: {e}"),
    })
}

/// Check the sections every deployable ADT needs, naming the first one at fault.
pub fn validate_adt(adt: &Value) -> Result<(), ArtefactError> {
    let missing = |field: &str| ArtefactError::MissingField {
        field: field.to_string(),
    };

    let root = adt.as_object().ok_or_else(|| ArtefactError::Decode {
        reason: "ADT must be a YAML mapping".to_string(),
    })?;

    let version = root
        .get("tosca_definitions_version")
        .filter(|v| !v.is_null())
        .ok_or_else(|| missing("tosca_definitions_version"))?;
    if !version
        .as_str()
        .is_some_and(|v| SUPPORTED_TOSCA_VERSIONS.contains(&v))
    {
        return Err(ArtefactError::InvalidField {
            field: "tosca_definitions_version".to_string(),
            reason: format!("{version} is not one of {}", SUPPORTED_TOSCA_VERSIONS.join(", ")),
        });
    }

    if !root.get("imports").is_some_and(is_truthy) {
        return Err(missing("imports"));
    }

    let topology = root
        .get("topology_template")
        .and_then(Value::as_object)
        .ok_or_else(|| missing("topology_template"))?;

    match topology.get("node_templates") {
        None | Some(Value::Null) => Err(missing("topology_template.node_templates")),
        Some(Value::Object(templates)) if !templates.is_empty() => Ok(()),
        Some(_) => Err(ArtefactError::InvalidField {
            field: "topology_template.node_templates".to_string(),
            reason: "must be a non-empty mapping".to_string(),
        }),
    }
}

/// Declared topology inputs, excluding platform-provided ones.
#[must_use]
pub fn adt_inputs(adt: &Value) -> Vec<AdtInput> {
    let Some(inputs) = adt
        .get("topology_template")
        .and_then(|t| t.get("inputs"))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };

    inputs
        .iter()
        .filter(|(key, _)| !key.starts_with(PLATFORM_INPUT_PREFIX))
        .map(|(key, details)| {
            let text = |name: &str, fallback: &str| {
                details
                    .get(name)
                    .and_then(Value::as_str)
                    .unwrap_or(fallback)
                    .trim_end()
                    .to_string()
            };
            AdtInput {
                key: key.clone(),
                description: text("description", "n/a"),
                required: details
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
                kind: text("type", "string"),
                default: details
                    .get("default")
                    .cloned()
                    .unwrap_or_else(|| Value::String(String::new())),
            }
        })
        .collect()
}

/// Declared inputs of every topology in a CSAR archive.
///
/// Only `.yaml` entries are read; entries starting with `__` are skipped.
pub fn csar_inputs(archive: &[u8]) -> Result<Vec<AdtInput>, ArtefactError> {
    let bad_archive = |reason: String| ArtefactError::Decode {
        reason: format!("bundle is not a readable CSAR archive: {reason}"),
    };

    let mut zip = ZipArchive::new(Cursor::new(archive)).map_err(|e| bad_archive(e.to_string()))?;
    let mut inputs = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| bad_archive(e.to_string()))?;
        let name = entry.name().to_string();
        if !name.ends_with(".yaml") || name.starts_with("__") {
            continue;
        }

        let mut text = String::new();
        entry
            .read_to_string(&mut text)
            .map_err(|e| bad_archive(format!("{name}: {e}")))?;
        let adt: Value = serde_yaml::from_str(&text).map_err(|e| ArtefactError::Decode {
            reason: format!("{name} in bundle is not YAML: {e}"),
        })?;
        inputs.extend(adt_inputs(&adt));
    }
    Ok(inputs)
}

/// Flatten the submitted parameters and lift out the application id.
///
/// With `declared` set, parameters the topology does not declare as inputs
/// are dropped.
fn collect_params(
    inputs: &SubmissionInputs,
    declared: Option<&[AdtInput]>,
) -> (Params, Option<String>) {
    let mut params: Params = inputs
        .parameters
        .iter()
        .flat_map(|entry| entry.iter().map(|(k, v)| (k.clone(), v.clone())))
        .collect();

    let app_id = params.remove(APP_ID_PARAM).and_then(|value| match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });

    if let Some(declared) = declared {
        params.retain(|key, _| {
            let known = declared.iter().any(|input| input.key == *key);
            if !known {
                tracing::debug!(param = %key, "Dropping parameter the topology does not declare");
            }
            known
        });
    }
    (params, app_id)
}

fn load_default_node_spec(path: &Utf8Path) -> Result<NodeSpec, ArtefactError> {
    let unavailable = |reason: String| ArtefactError::NodeSpecUnavailable {
        path: path.to_string(),
        reason,
    };

    let text = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
    let doc: Value = serde_yaml::from_str(&text).map_err(|e| unavailable(e.to_string()))?;
    let Some(Value::Object(properties)) = doc.get("properties").cloned() else {
        return Err(unavailable("no 'properties' mapping".to_string()));
    };

    let kept: Map<String, Value> = properties
        .into_iter()
        .filter(|(_, value)| is_truthy(value))
        .collect();
    Ok(NodeSpec(kept))
}

/// YAML truthiness: null, false, zero and empty values count as unset.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
