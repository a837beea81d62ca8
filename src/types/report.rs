use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 资源类别，对应报告中 `resources` 的四个固定键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Arxiv,
    HuggingFace,
    Kaggle,
    GitHub,
}

impl ResourceCategory {
    /// 全部类别，按报告输出顺序排列
    pub const ALL: [ResourceCategory; 4] = [
        ResourceCategory::Arxiv,
        ResourceCategory::HuggingFace,
        ResourceCategory::Kaggle,
        ResourceCategory::GitHub,
    ];

    /// JSON中使用的键名
    pub fn key(&self) -> &'static str {
        match self {
            ResourceCategory::Arxiv => "arxiv",
            ResourceCategory::HuggingFace => "huggingface",
            ResourceCategory::Kaggle => "kaggle",
            ResourceCategory::GitHub => "github",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.key().eq_ignore_ascii_case(key.trim()))
    }

    /// 面向用户的数据源名称
    pub fn source_name(&self) -> &'static str {
        match self {
            ResourceCategory::Arxiv => "arXiv",
            ResourceCategory::HuggingFace => "Hugging Face",
            ResourceCategory::Kaggle => "Kaggle",
            ResourceCategory::GitHub => "GitHub",
        }
    }

    /// 条目标题在输出中使用的字段名：论文和数据集为 `title`，模型和仓库为 `name`
    pub fn label_field(&self) -> &'static str {
        match self {
            ResourceCategory::Arxiv | ResourceCategory::Kaggle => "title",
            ResourceCategory::HuggingFace | ResourceCategory::GitHub => "name",
        }
    }

    /// 数据源站内搜索页面地址，作为占位资源的稳定链接
    pub fn search_url(&self, query: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        match self {
            ResourceCategory::Arxiv => format!("https://arxiv.org/search/?query={}&searchtype=all", encoded),
            ResourceCategory::HuggingFace => format!("https://huggingface.co/search/full-text?q={}", encoded),
            ResourceCategory::Kaggle => format!("https://www.kaggle.com/search?q={}", encoded),
            ResourceCategory::GitHub => {
                format!("https://github.com/search?q={}&type=repositories", encoded)
            }
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// 单条外部资源（论文、模型、数据集或代码仓库）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub title: String,
    pub url: String,
    /// 热度指标：GitHub stars、Hugging Face 下载量
    pub popularity: Option<u64>,
    /// 网页搜索结果的摘要文本
    pub snippet: Option<String>,
    /// 资源子类型，例如 `model` / `dataset` / `notebook`
    pub kind: Option<String>,
}

impl Resource {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            popularity: None,
            snippet: None,
            kind: None,
        }
    }

    pub fn with_popularity(mut self, popularity: u64) -> Self {
        self.popularity = Some(popularity);
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// 某类别没有任何结果时使用的占位资源
    pub fn placeholder(category: ResourceCategory, use_case: &str) -> Self {
        let resource = Self::new(
            format!(
                "No {} results found for: {}",
                category.source_name(),
                use_case.trim()
            ),
            category.search_url(use_case),
        );
        match category {
            ResourceCategory::GitHub => resource.with_popularity(0),
            _ => resource,
        }
    }
}

/// 用例的资源映射，键为资源类别，值保持数据源原始排序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resources(BTreeMap<ResourceCategory, Vec<Resource>>);

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: ResourceCategory) -> Option<&[Resource]> {
        self.0.get(&category).map(Vec::as_slice)
    }

    pub fn insert(&mut self, category: ResourceCategory, resources: Vec<Resource>) {
        self.0.insert(category, resources);
    }

    pub fn contains(&self, category: ResourceCategory) -> bool {
        self.0.contains_key(&category)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceCategory, &Vec<Resource>)> {
        self.0.iter()
    }

    /// 四个类别均存在且非空
    pub fn is_complete(&self) -> bool {
        ResourceCategory::ALL
            .iter()
            .all(|category| self.get(*category).is_some_and(|items| !items.is_empty()))
    }
}

impl Serialize for Resources {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, items) in &self.0 {
            let entries: Vec<ResourceEntry<'_>> = items
                .iter()
                .map(|resource| ResourceEntry {
                    category: *category,
                    resource,
                })
                .collect();
            map.serialize_entry(category.key(), &entries)?;
        }
        map.end()
    }
}

/// 按类别输出不同字段形状的单条资源
struct ResourceEntry<'a> {
    category: ResourceCategory,
    resource: &'a Resource,
}

impl Serialize for ResourceEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let with_stars = self.category == ResourceCategory::GitHub;
        let mut map = serializer.serialize_map(Some(if with_stars { 3 } else { 2 }))?;
        map.serialize_entry(self.category.label_field(), &self.resource.title)?;
        map.serialize_entry("url", &self.resource.url)?;
        if with_stars {
            map.serialize_entry("stars", &self.resource.popularity.unwrap_or(0))?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default, alias = "name")]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    stars: Option<u64>,
}

impl<'de> Deserialize<'de> for Resources {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<RawEntry>>::deserialize(deserializer)?;
        let mut resources = Resources::new();
        for (key, entries) in raw {
            // 未知类别直接忽略
            let Some(category) = ResourceCategory::from_key(&key) else {
                continue;
            };
            let items = entries
                .into_iter()
                .map(|entry| Resource {
                    title: entry.title,
                    url: entry.url,
                    popularity: entry.stars,
                    snippet: None,
                    kind: None,
                })
                .collect();
            resources.insert(category, items);
        }
        Ok(resources)
    }
}

/// AI用例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCase {
    #[serde(rename = "use_case", default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resources: Resources,
}

impl UseCase {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            resources: Resources::new(),
        }
    }
}

/// 最终报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub company: String,
    #[serde(default)]
    pub company_summary: String,
    #[serde(rename = "ai_use_cases", default)]
    pub use_cases: Vec<UseCase>,
}

impl Report {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            company_summary: String::new(),
            use_cases: Vec::new(),
        }
    }
}
