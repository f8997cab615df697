//! Process requirements — tagged union over the requirement classes the
//! model understands.
//!
//! Requirements serialize as mappings discriminated by their `class` field;
//! an empty requirements list is omitted from the document entirely.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Number, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum ProcessRequirement {
    /// Needed when a workflow runs other workflows as steps.
    SubworkflowFeatureRequirement,

    ScatterFeatureRequirement,

    #[serde(rename_all = "camelCase")]
    InlineJavascriptRequirement {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        expression_lib: Option<Vec<String>>,
    },

    #[serde(rename_all = "camelCase")]
    DockerRequirement {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        docker_pull: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        docker_load: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        docker_file: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        docker_import: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        docker_image_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        docker_output_directory: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    ResourceRequirement {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        cores_min: Option<Number>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        cores_max: Option<Number>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        ram_min: Option<Number>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        ram_max: Option<Number>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        tmpdir_min: Option<Number>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        tmpdir_max: Option<Number>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        outdir_min: Option<Number>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        outdir_max: Option<Number>,
    },

    #[serde(rename_all = "camelCase")]
    EnvVarRequirement { env_def: Mapping },

    InitialWorkDirRequirement { listing: Value },

    SoftwareRequirement { packages: Value },

    #[serde(rename_all = "camelCase")]
    NetworkAccess { network_access: Value },
}

impl ProcessRequirement {
    pub fn inline_javascript() -> ProcessRequirement {
        ProcessRequirement::InlineJavascriptRequirement {
            expression_lib: None,
        }
    }

    /// The `class` discriminator this requirement serializes under.
    pub fn class_name(&self) -> &'static str {
        match self {
            ProcessRequirement::SubworkflowFeatureRequirement => "SubworkflowFeatureRequirement",
            ProcessRequirement::ScatterFeatureRequirement => "ScatterFeatureRequirement",
            ProcessRequirement::InlineJavascriptRequirement { .. } => {
                "InlineJavascriptRequirement"
            }
            ProcessRequirement::DockerRequirement { .. } => "DockerRequirement",
            ProcessRequirement::ResourceRequirement { .. } => "ResourceRequirement",
            ProcessRequirement::EnvVarRequirement { .. } => "EnvVarRequirement",
            ProcessRequirement::InitialWorkDirRequirement { .. } => "InitialWorkDirRequirement",
            ProcessRequirement::SoftwareRequirement { .. } => "SoftwareRequirement",
            ProcessRequirement::NetworkAccess { .. } => "NetworkAccess",
        }
    }
}
