//! Module manifest schema
//!
//! [`ModuleManifest`] is the typed form of a `.psd1` manifest. It is turned
//! into a [`DataMap`] with a fixed key order so two builds of the same
//! module always produce the same file. [`ManifestInfo`] reads back the few
//! keys the release workflow needs from an existing manifest.

use super::value::{DataMap, DataValue};
use crate::domain::{
    BoundVersion, Compatibility, DeclKind, DependencyBounds, DependencySpec, Edition, SemVer,
};
use crate::error::ManifestError;

/// Placeholder version written by `build`; `publish` replaces it
pub const PLACEHOLDER_VERSION: &str = "999.0.0";

/// Typed manifest content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleManifest {
    /// Script module file loaded on import (`Name.psm1`)
    pub root_module: Option<String>,
    /// Numeric module version, without prerelease
    pub module_version: String,
    /// Editions written to `CompatiblePSEditions`
    pub compatible_editions: Vec<Edition>,
    pub guid: Option<String>,
    pub author: Option<String>,
    pub company_name: Option<String>,
    pub copyright: Option<String>,
    pub description: Option<String>,
    /// Minimum host version
    pub powershell_version: Option<BoundVersion>,
    /// Merged dependencies, in merge order
    pub required_modules: Vec<DependencySpec>,
    pub file_list: Vec<String>,
    pub functions_to_export: Vec<String>,
    pub cmdlets_to_export: Vec<String>,
    pub variables_to_export: Vec<String>,
    pub aliases_to_export: Vec<String>,
    pub tags: Vec<String>,
    pub license_uri: Option<String>,
    pub project_uri: Option<String>,
    pub icon_uri: Option<String>,
    pub release_notes: Option<String>,
    /// Prerelease label without the leading `-`
    pub prerelease: Option<String>,
}

impl ModuleManifest {
    /// Manifest for `name` at the placeholder version
    pub fn new(name: &str) -> Self {
        Self {
            root_module: Some(format!("{}.psm1", name)),
            module_version: PLACEHOLDER_VERSION.to_string(),
            ..Default::default()
        }
    }

    /// Render to the canonical document
    pub fn to_document(&self) -> DataMap {
        let mut doc = DataMap::new();
        insert_opt(&mut doc, "RootModule", &self.root_module);
        doc.insert("ModuleVersion", self.module_version.as_str());
        if !self.compatible_editions.is_empty() {
            doc.insert(
                "CompatiblePSEditions",
                string_list(self.compatible_editions.iter().map(Edition::as_str)),
            );
        }
        insert_opt(&mut doc, "GUID", &self.guid);
        insert_opt(&mut doc, "Author", &self.author);
        insert_opt(&mut doc, "CompanyName", &self.company_name);
        insert_opt(&mut doc, "Copyright", &self.copyright);
        insert_opt(&mut doc, "Description", &self.description);
        if let Some(version) = &self.powershell_version {
            doc.insert("PowerShellVersion", version.as_str());
        }
        doc.insert(
            "RequiredModules",
            DataValue::List(self.required_modules.iter().map(required_module_entry).collect()),
        );
        doc.insert("FileList", string_list(self.file_list.iter().map(String::as_str)));
        doc.insert(
            "FunctionsToExport",
            string_list(self.functions_to_export.iter().map(String::as_str)),
        );
        doc.insert(
            "CmdletsToExport",
            string_list(self.cmdlets_to_export.iter().map(String::as_str)),
        );
        doc.insert(
            "VariablesToExport",
            string_list(self.variables_to_export.iter().map(String::as_str)),
        );
        doc.insert(
            "AliasesToExport",
            string_list(self.aliases_to_export.iter().map(String::as_str)),
        );

        let ps_data = self.ps_data();
        if !ps_data.is_empty() {
            doc.insert("PrivateData", DataMap::new().with("PSData", ps_data));
        }
        doc
    }

    fn ps_data(&self) -> DataMap {
        let mut ps_data = DataMap::new();
        if !self.tags.is_empty() {
            let mut tags = self.tags.clone();
            tags.sort();
            tags.dedup();
            ps_data.insert("Tags", tags);
        }
        insert_opt(&mut ps_data, "LicenseUri", &self.license_uri);
        insert_opt(&mut ps_data, "ProjectUri", &self.project_uri);
        insert_opt(&mut ps_data, "IconUri", &self.icon_uri);
        insert_opt(&mut ps_data, "ReleaseNotes", &self.release_notes);
        insert_opt(
            &mut ps_data,
            "Prerelease",
            &self.prerelease.clone().filter(|p| !p.is_empty()),
        );
        ps_data
    }
}

fn insert_opt(doc: &mut DataMap, key: &str, value: &Option<String>) {
    if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
        doc.insert(key, value);
    }
}

fn string_list<'a>(items: impl Iterator<Item = &'a str>) -> DataValue {
    DataValue::List(items.map(DataValue::from).collect())
}

/// `RequiredModules` entry: bare name, or a hashtable with the bounds that are set
fn required_module_entry(spec: &DependencySpec) -> DataValue {
    if spec.is_bare() {
        return DataValue::from(spec.name.as_str());
    }

    let mut entry = DataMap::new().with("ModuleName", spec.name.as_str());
    if let Some(exact) = &spec.exact {
        entry.insert("RequiredVersion", exact.as_str());
        return DataValue::Map(entry);
    }
    if let Some(minimum) = &spec.minimum {
        entry.insert("ModuleVersion", minimum.as_str());
    }
    if let Some(maximum) = &spec.maximum {
        entry.insert("MaximumVersion", maximum.as_str());
    }
    DataValue::Map(entry)
}

/// Read one `RequiredModules` element back into a declaration
pub fn declaration_from_value(value: &DataValue) -> Result<DeclKind, ManifestError> {
    match value {
        DataValue::String(name) => Ok(DeclKind::name(name.trim())),
        DataValue::Map(map) => {
            let name = map
                .get("ModuleName")
                .and_then(DataValue::to_scalar_string)
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| ManifestError::InvalidValue {
                    key: "RequiredModules".to_string(),
                    message: "hashtable entry without ModuleName".to_string(),
                })?;
            let bounds = DependencyBounds {
                exact: bound_field(map, "RequiredVersion")?,
                minimum: bound_field(map, "ModuleVersion")?,
                maximum: bound_field(map, "MaximumVersion")?,
            };
            if bounds.is_empty() {
                Ok(DeclKind::name(name.trim()))
            } else {
                Ok(DeclKind::spec(name.trim(), bounds))
            }
        }
        other => Err(ManifestError::InvalidValue {
            key: "RequiredModules".to_string(),
            message: format!("expected a name or hashtable, found {:?}", other),
        }),
    }
}

fn bound_field(map: &DataMap, key: &str) -> Result<Option<BoundVersion>, ManifestError> {
    match map.get(key).and_then(DataValue::to_scalar_string) {
        Some(raw) if !raw.trim().is_empty() => BoundVersion::parse(&raw)
            .map(Some)
            .map_err(|e| ManifestError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        _ => Ok(None),
    }
}

/// Fields of an existing manifest used by the release workflow
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManifestInfo {
    pub module_version: Option<String>,
    pub prerelease: Option<String>,
    pub compatibility: Compatibility,
    pub required_modules: Vec<DeclKind>,
}

impl ManifestInfo {
    pub fn from_document(doc: &DataMap) -> Result<Self, ManifestError> {
        let module_version = doc.get("ModuleVersion").and_then(DataValue::to_scalar_string);
        let prerelease = ps_data(doc)
            .and_then(|data| data.get("Prerelease"))
            .and_then(DataValue::to_scalar_string)
            .filter(|p| !p.is_empty());

        let editions = doc
            .get("CompatiblePSEditions")
            .and_then(DataValue::to_string_list)
            .unwrap_or_default()
            .iter()
            .map(|name| {
                Edition::parse(name).ok_or_else(|| ManifestError::InvalidValue {
                    key: "CompatiblePSEditions".to_string(),
                    message: format!("unknown edition '{}'", name),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let minimum_host_version = bound_field(doc, "PowerShellVersion")?;

        let required_modules = match doc.get("RequiredModules") {
            None | Some(DataValue::Null) => Vec::new(),
            Some(DataValue::List(items)) => items
                .iter()
                .map(declaration_from_value)
                .collect::<Result<Vec<_>, _>>()?,
            Some(single) => vec![declaration_from_value(single)?],
        };

        Ok(Self {
            module_version,
            prerelease,
            compatibility: Compatibility::new(editions, minimum_host_version),
            required_modules,
        })
    }

    /// Declared version including the prerelease label, if any
    pub fn full_version(&self) -> Option<String> {
        let version = self.module_version.as_ref()?;
        Some(match &self.prerelease {
            Some(prerelease) => format!("{}-{}", version, prerelease),
            None => version.clone(),
        })
    }
}

fn ps_data(doc: &DataMap) -> Option<&DataMap> {
    doc.get("PrivateData")
        .and_then(DataValue::as_map)
        .and_then(|data| data.get("PSData"))
        .and_then(DataValue::as_map)
}

/// Stamp a resolved release version into a manifest document
pub fn set_release_version(doc: &mut DataMap, version: &SemVer) {
    doc.insert("ModuleVersion", version.core_string());
    if version.is_prerelease() {
        doc.map_entry("PrivateData")
            .map_entry("PSData")
            .insert("Prerelease", version.prerelease.as_str());
    } else if let Some(DataValue::Map(private)) = doc.get_mut("PrivateData") {
        if let Some(DataValue::Map(data)) = private.get_mut("PSData") {
            data.remove("Prerelease");
        }
    }
}
