//! Package and tool catalogs (read-only from the portal's perspective).

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use keyportal_core::scalar::optional_scalar;
use keyportal_core::{PackageId, ToolId};

/// Mapping from package identifier to the tools it bundles, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageMap(IndexMap<PackageId, Vec<ToolId>>);

/// A package written with no value (`pro:`) bundles nothing.
impl<'de> Deserialize<'de> for PackageMap {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw: IndexMap<PackageId, Option<Vec<ToolId>>> = IndexMap::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|(package, tools)| (package, tools.unwrap_or_default()))
            .collect())
    }
}

impl PackageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tools bundled by `package`, or `None` if the package is not defined.
    pub fn tools_for(&self, package: &PackageId) -> Option<&[ToolId]> {
        self.0.get(package).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(PackageId, Vec<ToolId>)> for PackageMap {
    fn from_iter<I: IntoIterator<Item = (PackageId, Vec<ToolId>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Metadata for one tool. The identifier is the key in [`ToolCatalog`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    #[serde(default, deserialize_with = "optional_scalar")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub desc: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub url: Option<String>,
}

/// A tool ready to be rendered as a link card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCard {
    pub id: ToolId,
    pub name: String,
    pub desc: String,
    /// `None` renders as a disabled "URL not set" button.
    pub url: Option<String>,
}

/// Tool metadata keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ToolCatalog(IndexMap<ToolId, ToolInfo>);

/// A tool written with no value (`crm:`) has empty metadata.
impl<'de> Deserialize<'de> for ToolCatalog {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw: IndexMap<ToolId, Option<ToolInfo>> = IndexMap::deserialize(d)?;
        Ok(raw
            .into_iter()
            .map(|(id, info)| (id, info.unwrap_or_default()))
            .collect())
    }
}

impl ToolCatalog {
    /// Display name of `id`, falling back to the identifier itself.
    pub fn display_name<'a>(&'a self, id: &'a ToolId) -> &'a str {
        self.0
            .get(id)
            .and_then(|info| non_blank(info.name.as_deref()))
            .unwrap_or(id.as_str())
    }

    /// Cards for `tools`, in the given order.
    ///
    /// Identifiers with no catalog entry are skipped silently.
    pub fn cards(&self, tools: &[ToolId]) -> Vec<ToolCard> {
        tools
            .iter()
            .filter_map(|id| {
                let info = self.0.get(id)?;
                Some(ToolCard {
                    id: id.clone(),
                    name: non_blank(info.name.as_deref())
                        .unwrap_or(id.as_str())
                        .to_string(),
                    desc: info.desc.clone().unwrap_or_default(),
                    url: non_blank(info.url.as_deref()).map(str::to_string),
                })
            })
            .collect()
    }
}

impl FromIterator<(ToolId, ToolInfo)> for ToolCatalog {
    fn from_iter<I: IntoIterator<Item = (ToolId, ToolInfo)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
