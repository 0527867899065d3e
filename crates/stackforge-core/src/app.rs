//! The application root: a set of stacks and their synthesized assembly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SynthError, SynthResult};
use crate::stack::Stack;

pub const ASSEMBLY_VERSION: &str = "1.0";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Root of the construct tree. Stacks are added once and serialized as a
/// unit; synthesis has no further side effects inside this process.
#[derive(Debug, Default)]
pub struct App {
    stacks: Vec<Stack>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stack(&mut self, stack: Stack) -> SynthResult<()> {
        if self.stacks.iter().any(|s| s.name() == stack.name()) {
            return Err(SynthError::DuplicateStack(stack.name().to_string()));
        }
        self.stacks.push(stack);
        Ok(())
    }

    pub fn stack_names(&self) -> Vec<&str> {
        self.stacks.iter().map(Stack::name).collect()
    }

    pub fn stacks(&self) -> &[Stack] {
        &self.stacks
    }

    /// Serialize every stack into its deployment template.
    ///
    /// Synthesis with unchanged inputs is byte-identical: resource maps are
    /// ordered and nothing here consults a clock or random source.
    pub fn synth(&self) -> SynthResult<CloudAssembly> {
        let mut templates = BTreeMap::new();
        let mut stacks = Vec::new();

        for stack in &self.stacks {
            let template = stack.render();
            let mut body = serde_json::to_string_pretty(&template)?;
            body.push('\n');
            templates.insert(stack.name().to_string(), body);

            stacks.push(StackManifestEntry {
                name: stack.name().to_string(),
                template_file: template_file_name(stack.name()),
                account: stack.env().account.clone(),
                region: stack.env().region.clone(),
                assets: stack
                    .assets()
                    .iter()
                    .map(|asset| AssetManifestEntry {
                        context: asset.context.display().to_string(),
                        fingerprint: asset.fingerprint.clone(),
                        image_uri: asset.image_uri(stack.env()),
                    })
                    .collect(),
            });
        }

        Ok(CloudAssembly {
            templates,
            manifest: AssemblyManifest {
                version: ASSEMBLY_VERSION.to_string(),
                stacks,
            },
        })
    }
}

/// Index of a synthesized assembly, written next to the templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyManifest {
    pub version: String,
    pub stacks: Vec<StackManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackManifestEntry {
    pub name: String,
    pub template_file: String,
    pub account: String,
    pub region: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub assets: Vec<AssetManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetManifestEntry {
    pub context: String,
    pub fingerprint: String,
    pub image_uri: String,
}

/// The synthesized output: one template per stack plus the manifest.
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    templates: BTreeMap<String, String>,
    manifest: AssemblyManifest,
}

impl CloudAssembly {
    pub fn template(&self, stack: &str) -> Option<&str> {
        self.templates.get(stack).map(String::as_str)
    }

    pub fn manifest(&self) -> &AssemblyManifest {
        &self.manifest
    }

    /// Write all templates and the manifest into `dir`, returning the
    /// written paths.
    pub fn write_to(&self, dir: &Path) -> SynthResult<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();

        for (stack, body) in &self.templates {
            let path = dir.join(template_file_name(stack));
            fs::write(&path, body)?;
            written.push(path);
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        let mut manifest = serde_json::to_string_pretty(&self.manifest)?;
        manifest.push('\n');
        fs::write(&manifest_path, manifest)?;
        written.push(manifest_path);

        Ok(written)
    }

    /// Write a single stack's template into `dir`.
    pub fn write_stack_to(&self, dir: &Path, stack: &str) -> SynthResult<PathBuf> {
        let body = self
            .templates
            .get(stack)
            .ok_or_else(|| SynthError::UnknownStack(stack.to_string()))?;
        fs::create_dir_all(dir)?;
        let path = dir.join(template_file_name(stack));
        fs::write(&path, body)?;
        Ok(path)
    }
}

fn template_file_name(stack: &str) -> String {
    format!("{stack}.template.json")
}
