//! 创业公司原始输入

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 投资人提交的一条创业公司输入
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartupInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch_deck_url: Option<String>,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub geography: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub existing_competitors: Vec<String>,
}

impl StartupInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    pub fn with_pitch_deck(mut self, url: impl Into<String>) -> Self {
        self.pitch_deck_url = Some(url.into());
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = sector.into();
        self
    }

    pub fn with_geography(mut self, geography: impl Into<String>) -> Self {
        self.geography = geography.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 校验并规范化输入
    ///
    /// 去除首尾空白，空字符串的可选字段视为缺失。
    ///
    /// # 参数
    /// - `index`: 输入在提交列表中的位置（从 1 开始，仅用于错误信息）
    pub fn validated(mut self, index: usize) -> Result<Self, ValidationError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(ValidationError::MissingName { index });
        }

        self.website = non_blank(self.website);
        self.pitch_deck_url = non_blank(self.pitch_deck_url);
        self.description = non_blank(self.description);
        self.sector = self.sector.trim().to_string();
        self.geography = self.geography.trim().to_string();
        self.existing_competitors = self
            .existing_competitors
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        for (field, value) in [
            ("website", &self.website),
            ("pitchDeckUrl", &self.pitch_deck_url),
        ] {
            if let Some(value) = value {
                if value.chars().any(char::is_whitespace) {
                    return Err(ValidationError::InvalidUrl {
                        index,
                        field,
                        value: value.clone(),
                    });
                }
            }
        }

        Ok(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
