//! pkg-config descriptor generation.
//!
//! Each output module gets a `lib<name>.pc` rendered from its template:
//!
//! - `@prefix@` becomes the package root
//! - `@version@` becomes the module's pinned version
//! - `@requires@` lists the sibling modules it depends on, version-pinned
//! - `-l<name>` becomes `-l<name>d` for shared builds
//!
//! Every descriptor is rendered in memory before the first file is written,
//! so a missing version or template leaves the pkgconfig directory untouched.
//! Writes go through a staging directory, so a failed write does too.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::patch::replace_tokens;
use crate::core::errors::RecipeError;
use crate::core::layout::PackageLayout;
use crate::core::options::LinkMode;
use crate::ops::assemble::sibling;
use crate::resolver::ResolvedConfiguration;
use crate::util::fs::{remove_dir_all_if_exists, replace_dirs, write_string};

/// Link-name suffix of the shared import libraries.
const SHARED_LINK_SUFFIX: &str = "d";

const TEMPLATE_SUFFIX: &str = ".pc.in";

const PKGCONFIG: &str = "pkgconfig";

const EMBEDDED: [(&str, &str); 7] = [
    ("avcodec", include_str!("../../recipe/pc/libavcodec.pc.in")),
    ("avdevice", include_str!("../../recipe/pc/libavdevice.pc.in")),
    ("avfilter", include_str!("../../recipe/pc/libavfilter.pc.in")),
    ("avformat", include_str!("../../recipe/pc/libavformat.pc.in")),
    ("avutil", include_str!("../../recipe/pc/libavutil.pc.in")),
    ("swresample", include_str!("../../recipe/pc/libswresample.pc.in")),
    ("swscale", include_str!("../../recipe/pc/libswscale.pc.in")),
];

/// Descriptor templates keyed by module name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSet {
    templates: BTreeMap<String, String>,
}

impl TemplateSet {
    /// The templates shipped with the crate.
    pub fn embedded() -> Self {
        TemplateSet {
            templates: EMBEDDED
                .iter()
                .map(|(name, text)| (name.to_string(), text.to_string()))
                .collect(),
        }
    }

    /// Load every `lib<name>.pc.in` in `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self, RecipeError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            RecipeError::io(format!("failed to read templates in {}", dir.display()), e)
        })?;

        let mut templates = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                RecipeError::io(format!("failed to read templates in {}", dir.display()), e)
            })?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(module) = file_name
                .strip_prefix("lib")
                .and_then(|rest| rest.strip_suffix(TEMPLATE_SUFFIX))
            else {
                continue;
            };

            let path = entry.path();
            let text = fs::read_to_string(&path).map_err(|e| {
                RecipeError::io(format!("failed to read {}", path.display()), e)
            })?;
            tracing::debug!("Loaded descriptor template {}", path.display());
            templates.insert(module.to_string(), text);
        }

        Ok(TemplateSet { templates })
    }

    pub fn insert(&mut self, module: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(module.into(), template.into());
    }

    pub fn get(&self, module: &str) -> Option<&str> {
        self.templates.get(module).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A rendered descriptor for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    pub module_name: String,
    pub version: String,
    /// Library name after `-l`.
    pub link_name: String,
    /// Sibling modules this one links against.
    pub requires: Vec<String>,
    pub file_name: String,
    #[serde(skip)]
    pub contents: String,
}

/// Library name a module links as under `link_mode`.
pub fn link_name(module: &str, link_mode: LinkMode) -> String {
    match link_mode {
        LinkMode::Shared => format!("{}{}", module, SHARED_LINK_SUFFIX),
        LinkMode::Static => module.to_string(),
    }
}

/// Render every module's descriptor without writing anything.
pub fn render_descriptors(
    layout: &PackageLayout,
    resolved: &ResolvedConfiguration,
    link_mode: LinkMode,
    templates: &TemplateSet,
) -> Result<Vec<ModuleDescriptor>, RecipeError> {
    let modules = resolved.modules();

    // The whole version table must be complete before anything is rendered.
    for module in modules {
        if resolved.module_version(&module.name).is_none() {
            return Err(RecipeError::MissingVersion {
                module: module.name.clone(),
            });
        }
    }

    let prefix = layout.root().to_string_lossy().replace('\\', "/");
    let mut descriptors = Vec::with_capacity(modules.len());

    for module in modules {
        let template = templates.get(&module.name).ok_or_else(|| {
            RecipeError::InvalidRecipe(format!(
                "no descriptor template `lib{}{}`",
                module.name, TEMPLATE_SUFFIX
            ))
        })?;
        let version = resolved
            .module_version(&module.name)
            .ok_or_else(|| RecipeError::MissingVersion {
                module: module.name.clone(),
            })?
            .to_string();

        let requires = module
            .requires
            .iter()
            .map(|dep| {
                resolved
                    .module_version(dep)
                    .map(|v| format!("lib{} >= {}", dep, v))
                    .ok_or_else(|| RecipeError::MissingVersion { module: dep.clone() })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let link_name = link_name(&module.name, link_mode);
        let contents = template
            .replace("@prefix@", &prefix)
            .replace("@version@", &version)
            .replace("@requires@", &requires.join(", "));
        let (contents, _) = replace_tokens(
            &contents,
            &format!("-l{}", module.name),
            &format!("-l{}", link_name),
        );

        descriptors.push(ModuleDescriptor {
            module_name: module.name.clone(),
            version,
            link_name,
            requires: module.requires.clone(),
            file_name: format!("lib{}.pc", module.name),
            contents,
        });
    }

    Ok(descriptors)
}

/// Render and write every module's descriptor into `layout`.
///
/// The files are written to a staging directory and replace the pkgconfig
/// directory in one move.
pub fn generate_descriptors(
    layout: &PackageLayout,
    resolved: &ResolvedConfiguration,
    link_mode: LinkMode,
    templates: &TemplateSet,
) -> Result<Vec<ModuleDescriptor>, RecipeError> {
    let descriptors = render_descriptors(layout, resolved, link_mode, templates)?;

    let pkgconfig = &layout.pkgconfig_dir;
    let staging = sibling(pkgconfig, "staging")?;
    let written = write_staged(&descriptors, &staging).and_then(|()| {
        let backup = sibling(pkgconfig, "previous")?;
        let parent = pkgconfig.parent().unwrap_or(layout.root());
        replace_dirs(&staging, parent, &backup, &[PathBuf::from(PKGCONFIG)])
            .map_err(|e| write_error(pkgconfig, e))
    });
    if let Err(e) = remove_dir_all_if_exists(&staging) {
        tracing::warn!("failed to clean up {}: {:#}", staging.display(), e);
    }
    written?;

    tracing::info!(
        "Generated {} descriptors in {}",
        descriptors.len(),
        pkgconfig.display()
    );
    Ok(descriptors)
}

fn write_staged(descriptors: &[ModuleDescriptor], staging: &Path) -> Result<(), RecipeError> {
    remove_dir_all_if_exists(staging).map_err(|e| write_error(staging, e))?;
    for descriptor in descriptors {
        let path = staging.join(PKGCONFIG).join(&descriptor.file_name);
        write_string(&path, &descriptor.contents).map_err(|e| write_error(&path, e))?;
        tracing::debug!("Wrote {}", path.display());
    }
    Ok(())
}

fn write_error(path: &Path, err: anyhow::Error) -> RecipeError {
    RecipeError::io(
        format!("failed to write descriptors to {}", path.display()),
        io::Error::other(err),
    )
}
