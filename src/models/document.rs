//! 文档与抓取目标
//!
//! 一次运行中的数据流：
//! `DocumentRecord` → `DocumentUri` → `FetchTarget` → `FetchOutcome`

use crate::error::FetchError;
use serde::{Deserialize, Deserializer};
use std::fmt::{self, Display};
use std::str::FromStr;

/// 抓取的数据类型，整个运行期间固定
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 作者及机构
    Authorships,
    /// 可持续发展目标
    Sdgs,
    /// 主题分类
    Topics,
}

impl DataType {
    pub const ALL: [DataType; 3] = [DataType::Authorships, DataType::Sdgs, DataType::Topics];

    /// 命令行与配置文件中使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Authorships => "authorships",
            DataType::Sdgs => "sdgs",
            DataType::Topics => "topics",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "未知的数据类型 '{}'，可选值: authorships, sdgs, topics",
                    s
                )
            })
    }
}

/// 文档来源返回的一条记录
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentRecord {
    /// 文档标识（JSON 中可以是字符串或数字）
    #[serde(deserialize_with = "string_or_number")]
    pub paper_id: String,
    pub doi: String,
}

impl DocumentRecord {
    pub fn new(paper_id: impl Into<String>, doi: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            doi: doi.into(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
    })
}

/// 文档 URI，由模板和 paper_id 生成
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentUri(String);

impl DocumentUri {
    /// 模板占位符
    pub const PLACEHOLDER: &'static str = "{id}";
    /// 兼容旧配置的占位符
    pub const LEGACY_PLACEHOLDER: &'static str = "%s";

    /// 用 paper_id 替换模板中的占位符
    pub fn render(template: &str, paper_id: &str) -> Self {
        if template.contains(Self::PLACEHOLDER) {
            Self(template.replace(Self::PLACEHOLDER, paper_id))
        } else {
            Self(template.replacen(Self::LEGACY_PLACEHOLDER, paper_id, 1))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 一次抓取请求的目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub data_type: DataType,
    pub document_uri: DocumentUri,
    pub doi: String,
}

impl FetchTarget {
    pub fn new(data_type: DataType, document_uri: DocumentUri, doi: impl Into<String>) -> Self {
        Self {
            data_type,
            document_uri,
            doi: doi.into(),
        }
    }
}

impl Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} 文档 {} DOI {}]",
            self.data_type, self.document_uri, self.doi
        )
    }
}

/// 抓取结果：成功时为原始 Turtle 文本
pub type FetchOutcome = Result<String, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parse() {
        assert_eq!("sdgs".parse::<DataType>().unwrap(), DataType::Sdgs);
        assert_eq!(
            "authorships".parse::<DataType>().unwrap(),
            DataType::Authorships
        );
        assert!("authors".parse::<DataType>().is_err());
        assert_eq!(DataType::Topics.to_string(), "topics");
    }

    #[test]
    fn test_render_document_uri() {
        let uri = DocumentUri::render("http://data-issa.example.org/document/{id}", "42");
        assert_eq!(uri.as_str(), "http://data-issa.example.org/document/42");

        let legacy = DocumentUri::render("http://data-issa.example.org/document/%s", "abc");
        assert_eq!(legacy.as_str(), "http://data-issa.example.org/document/abc");
    }

    #[test]
    fn test_record_accepts_numeric_id() {
        let records: Vec<DocumentRecord> = serde_json::from_str(
            r#"[{"paper_id": 123, "doi": "10.1/a"}, {"paper_id": "x9", "doi": "10.1/b"}]"#,
        )
        .unwrap();
        assert_eq!(records[0], DocumentRecord::new("123", "10.1/a"));
        assert_eq!(records[1].paper_id, "x9");
    }
}
