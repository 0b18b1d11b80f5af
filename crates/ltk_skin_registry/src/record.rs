use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One installed skin (or chroma) for a single champion.
///
/// Serialized in camelCase. Older registry files written with
/// `championId`/`skinId`/`skinName`/`imageUrl` are still accepted; their
/// `processId` field is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledModRecord {
    /// Stable champion identifier. Registry key.
    #[serde(alias = "championId")]
    pub character_id: String,
    /// Skin or chroma identifier.
    #[serde(alias = "skinId", deserialize_with = "de::id_string")]
    pub mod_id: String,
    /// Archive file name inside the install directory.
    pub file_name: String,
    #[serde(alias = "skinName", default)]
    pub display_name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de::optional_chroma"
    )]
    pub chroma_name: Option<String>,
    #[serde(alias = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_ref: Option<String>,
    /// Overlay process generation that last had this archive loaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_generation: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

impl InstalledModRecord {
    pub fn new(
        character_id: impl Into<String>,
        mod_id: impl Into<String>,
        file_name: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            character_id: character_id.into(),
            mod_id: mod_id.into(),
            file_name: file_name.into(),
            display_name: display_name.into(),
            chroma_name: None,
            thumbnail_ref: None,
            process_generation: None,
            installed_at: None,
        }
    }

    pub fn with_chroma(mut self, chroma_name: impl Into<String>) -> Self {
        self.chroma_name = Some(chroma_name.into());
        self
    }

    pub fn with_thumbnail(mut self, thumbnail_ref: impl Into<String>) -> Self {
        self.thumbnail_ref = Some(thumbnail_ref.into());
        self
    }

    pub fn installed_now(mut self) -> Self {
        self.installed_at = Some(Utc::now());
        self
    }
}

mod de {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }

    /// Legacy files stored skin ids as numbers.
    pub fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Id::deserialize(deserializer)? {
            Id::Text(text) => text,
            Id::Number(number) => number.to_string(),
        })
    }

    /// `""` and `"null"` both mean "no chroma".
    pub fn optional_chroma<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|chroma| !chroma.is_empty() && chroma != "null"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_camel_case_without_empty_fields() {
        let record = InstalledModRecord::new(
            "Aatrox",
            "1001",
            "aatrox-skin-name.archive",
            "Aatrox Skin Name",
        );
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["characterId"], "Aatrox");
        assert_eq!(json["modId"], "1001");
        assert_eq!(json["fileName"], "aatrox-skin-name.archive");
        assert_eq!(json["displayName"], "Aatrox Skin Name");
        assert!(json.get("chromaName").is_none());
        assert!(json.get("processGeneration").is_none());
    }

    #[test]
    fn test_reads_legacy_field_names() {
        let json = r#"{
            "championId": "Ahri",
            "skinId": 103015,
            "fileName": "spirit-blossom-ahri.fantome",
            "processId": 4242,
            "chromaName": "null",
            "skinName": "Spirit Blossom Ahri",
            "imageUrl": "https://cdn.example/ahri.png"
        }"#;

        let record: InstalledModRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.character_id, "Ahri");
        assert_eq!(record.mod_id, "103015");
        assert_eq!(record.display_name, "Spirit Blossom Ahri");
        assert_eq!(record.chroma_name, None);
        assert_eq!(record.thumbnail_ref.as_deref(), Some("https://cdn.example/ahri.png"));
    }
}
