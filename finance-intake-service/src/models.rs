use page_flow::Flow;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// The wizard pages, in the only order a session can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Page {
    Checklist,
    InputForm,
    Report,
    Chat,
    Download,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Checklist,
        Page::InputForm,
        Page::Report,
        Page::Chat,
        Page::Download,
    ];

    /// The page a confirmed page advances to. `None` for the terminal page.
    pub fn next(self) -> Option<Page> {
        match self {
            Page::Checklist => Some(Page::InputForm),
            Page::InputForm => Some(Page::Report),
            Page::Report => Some(Page::Chat),
            Page::Chat => Some(Page::Download),
            Page::Download => None,
        }
    }
}

/// A personal-finance domain the user can ask about.
///
/// Serialized by its display label; the snake_case name is accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "세금 관리", alias = "tax")]
    Tax,
    #[serde(rename = "투자 관리", alias = "investment")]
    Investment,
    #[serde(rename = "연금 관리", alias = "pension")]
    Pension,
    #[serde(rename = "보험 관리", alias = "insurance")]
    Insurance,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Tax,
        Category::Investment,
        Category::Pension,
        Category::Insurance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Tax => "세금 관리",
            Category::Investment => "투자 관리",
            Category::Pension => "연금 관리",
            Category::Insurance => "보험 관리",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const MAX_TAX_RATE: u32 = 50;
pub const MAX_INTEREST_RATE: f64 = 10.0;
pub const DEFAULT_TAX_RATE: u32 = 15;
pub const DEFAULT_INTEREST_RATE: f64 = 3.0;

/// The values entered for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum CategoryRecord {
    #[serde(rename = "세금 관리", alias = "tax")]
    Tax { annual_income: u64, tax_rate: u32 },
    #[serde(rename = "투자 관리", alias = "investment")]
    Investment {
        #[serde(default)]
        ticker_name: String,
        share_count: u64,
        price_per_share: f64,
    },
    #[serde(rename = "연금 관리", alias = "pension")]
    Pension {
        monthly_contribution: u64,
        years: u64,
        annual_interest_rate: f64,
    },
    #[serde(rename = "보험 관리", alias = "insurance")]
    Insurance {
        #[serde(default)]
        policy_name: String,
        monthly_premium: u64,
        coverage_amount: u64,
    },
}

impl CategoryRecord {
    /// What an untouched form shows for `category`.
    pub fn default_for(category: Category) -> Self {
        match category {
            Category::Tax => CategoryRecord::Tax {
                annual_income: 0,
                tax_rate: DEFAULT_TAX_RATE,
            },
            Category::Investment => CategoryRecord::Investment {
                ticker_name: String::new(),
                share_count: 0,
                price_per_share: 0.0,
            },
            Category::Pension => CategoryRecord::Pension {
                monthly_contribution: 0,
                years: 0,
                annual_interest_rate: DEFAULT_INTEREST_RATE,
            },
            Category::Insurance => CategoryRecord::Insurance {
                policy_name: String::new(),
                monthly_premium: 0,
                coverage_amount: 0,
            },
        }
    }

    pub fn category(&self) -> Category {
        match self {
            CategoryRecord::Tax { .. } => Category::Tax,
            CategoryRecord::Investment { .. } => Category::Investment,
            CategoryRecord::Pension { .. } => Category::Pension,
            CategoryRecord::Insurance { .. } => Category::Insurance,
        }
    }

    /// Pull rates and prices back into the range the form widgets allow.
    pub fn clamped(self) -> Self {
        match self {
            CategoryRecord::Tax {
                annual_income,
                tax_rate,
            } => CategoryRecord::Tax {
                annual_income,
                tax_rate: tax_rate.min(MAX_TAX_RATE),
            },
            CategoryRecord::Investment {
                ticker_name,
                share_count,
                price_per_share,
            } => CategoryRecord::Investment {
                ticker_name,
                share_count,
                price_per_share: clamp_float(price_per_share, 0.0, f64::MAX),
            },
            CategoryRecord::Pension {
                monthly_contribution,
                years,
                annual_interest_rate,
            } => CategoryRecord::Pension {
                monthly_contribution,
                years,
                annual_interest_rate: clamp_float(annual_interest_rate, 0.0, MAX_INTEREST_RATE),
            },
            insurance @ CategoryRecord::Insurance { .. } => insurance,
        }
    }

    /// Labelled field values in display order.
    pub fn fields(&self) -> Vec<(&'static str, FieldValue)> {
        match self {
            CategoryRecord::Tax {
                annual_income,
                tax_rate,
            } => vec![
                ("연소득", FieldValue::Integer(*annual_income)),
                ("세율", FieldValue::Integer(u64::from(*tax_rate))),
            ],
            CategoryRecord::Investment {
                ticker_name,
                share_count,
                price_per_share,
            } => vec![
                ("종목 이름", FieldValue::Text(ticker_name.clone())),
                ("보유 주식 수", FieldValue::Integer(*share_count)),
                ("주당 가격", FieldValue::Decimal(*price_per_share)),
            ],
            CategoryRecord::Pension {
                monthly_contribution,
                years,
                annual_interest_rate,
            } => vec![
                ("월 납입액", FieldValue::Integer(*monthly_contribution)),
                ("납입 기간", FieldValue::Integer(*years)),
                ("연 이자율", FieldValue::Decimal(*annual_interest_rate)),
            ],
            CategoryRecord::Insurance {
                policy_name,
                monthly_premium,
                coverage_amount,
            } => vec![
                ("보험 이름", FieldValue::Text(policy_name.clone())),
                ("월 보험료", FieldValue::Integer(*monthly_premium)),
                ("보장 금액", FieldValue::Integer(*coverage_amount)),
            ],
        }
    }
}

// Non-finite values collapse to the lower bound.
fn clamp_float(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// A single form value as shown on the report.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(u64),
    Decimal(f64),
    Text(String),
}

impl FieldValue {
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Integer(value) => json!(value),
            FieldValue::Decimal(value) => json!(value),
            FieldValue::Text(value) => json!(value),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(value) => write!(f, "{value}"),
            // Whole numbers keep one decimal digit: 3.0, not 3
            FieldValue::Decimal(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            FieldValue::Decimal(value) => write!(f, "{value}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Prefix used when a turn is written into a transcript.
    pub fn label(self) -> &'static str {
        match self {
            ChatRole::User => "사용자",
            ChatRole::Assistant => "GPT",
        }
    }
}

/// One advisory turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Everything a session collects. Together with the session's current page this is the
/// whole session state.
#[derive(Debug, Clone, Default)]
pub struct IntakeData {
    pub selected_categories: Vec<Category>,
    pub category_data: BTreeMap<Category, CategoryRecord>,
    pub chat_history: Vec<ChatTurn>,
}

impl IntakeData {
    /// Replace the selection, dropping repeats but keeping first-seen order.
    pub fn select(&mut self, categories: impl IntoIterator<Item = Category>) {
        self.selected_categories.clear();
        for category in categories {
            if !self.selected_categories.contains(&category) {
                self.selected_categories.push(category);
            }
        }
    }

    pub fn is_selected(&self, category: Category) -> bool {
        self.selected_categories.contains(&category)
    }

    /// Store `record`, overwriting any earlier one for its category.
    /// Returns `false` and stores nothing when the category is not selected.
    pub fn record(&mut self, record: CategoryRecord) -> bool {
        let category = record.category();
        if !self.is_selected(category) {
            return false;
        }
        self.category_data.insert(category, record);
        true
    }

    /// Drop data for categories that are no longer selected. Returns what was dropped.
    pub fn prune_unselected(&mut self) -> Vec<Category> {
        let stale: Vec<Category> = self
            .category_data
            .keys()
            .copied()
            .filter(|category| !self.is_selected(*category))
            .collect();
        for category in &stale {
            self.category_data.remove(category);
        }
        stale
    }

    /// Give every selected category without data its form defaults.
    pub fn fill_defaults(&mut self) {
        for category in &self.selected_categories {
            self.category_data
                .entry(*category)
                .or_insert_with(|| CategoryRecord::default_for(*category));
        }
    }

    /// The record a form for `category` currently shows.
    pub fn form_values(&self, category: Category) -> CategoryRecord {
        self.category_data
            .get(&category)
            .cloned()
            .unwrap_or_else(|| CategoryRecord::default_for(category))
    }

    /// Records in selection order, limited to selected categories.
    pub fn report_sections(&self) -> impl Iterator<Item = &CategoryRecord> {
        self.selected_categories
            .iter()
            .filter_map(|category| self.category_data.get(category))
    }

    /// `{ "<category label>": { "<field label>": value, .. }, .. }`
    pub fn category_view(&self) -> Value {
        let mut view = Map::new();
        for record in self.report_sections() {
            let fields: Map<String, Value> = record
                .fields()
                .into_iter()
                .map(|(label, value)| (label.to_string(), value.to_json()))
                .collect();
            view.insert(record.category().label().to_string(), Value::Object(fields));
        }
        Value::Object(view)
    }
}

/// One user interaction with the current page.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageInput {
    /// Render the page without changing anything
    View,
    SelectCategories { categories: Vec<Category> },
    UpdateForm { records: Vec<CategoryRecord> },
    Ask { message: String },
    /// The page's single advance button
    Confirm,
}

impl PageInput {
    pub fn kind(&self) -> &'static str {
        match self {
            PageInput::View => "view",
            PageInput::SelectCategories { .. } => "select_categories",
            PageInput::UpdateForm { .. } => "update_form",
            PageInput::Ask { .. } => "ask",
            PageInput::Confirm => "confirm",
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntakeFlow;

impl Flow for IntakeFlow {
    type Page = Page;
    type Data = IntakeData;
    type Input = PageInput;
}

pub type IntakeSession = page_flow::Session<IntakeFlow>;
