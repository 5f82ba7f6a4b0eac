//! Canonical company schema.
//!
//! One immutable table drives both merging and coercion: field order, how a
//! field merges across sources, what it is stored as, and its default.

use serde::Serialize;
use serde_json::{Map, Value};

pub const NAME: &str = "name";
pub const IS_LISTED: &str = "is_listed";
pub const EMPLOYEE_COUNT: &str = "employee_count";
pub const INDUSTRY: &str = "industry";
pub const PRODUCTS_SERVICES: &str = "products_services";
pub const LATEST_REVENUE: &str = "latest_revenue";
pub const LATEST_OPERATING_INCOME: &str = "latest_operating_income";
pub const LATEST_NET_INCOME: &str = "latest_net_income";
pub const LATEST_FISCAL_YEAR: &str = "latest_fiscal_year";
pub const FINANCIAL_HISTORY: &str = "financial_history";

/// How a field combines values from several sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeKind {
    /// First non-empty value in precedence order.
    Scalar,
    /// Logical OR across sources.
    Flag,
    /// Year -> metric table merged metric by metric.
    YearMetricTable,
}

/// Type a field is coerced to in the canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum StoredType {
    Integer,
    /// First run of digits, e.g. "510명".
    Headcount,
    Boolean,
    Decimal,
    /// JSON array of strings. `split` breaks a delimited string apart.
    TextList { split: bool },
    /// Year -> metric -> normalized decimal string, JSON-encoded.
    FinancialTable,
    /// Arbitrary structure, JSON-encoded.
    Json,
    Date,
    Text,
}

/// Default a field takes when no source supplies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDefault {
    EmptyText,
    False,
    EmptyMapping,
}

impl FieldDefault {
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::EmptyText => Value::String(String::new()),
            FieldDefault::False => Value::Bool(false),
            FieldDefault::EmptyMapping => Value::Object(Map::new()),
        }
    }
}

/// One field of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    /// Korean label used by the scraped sites.
    pub label: &'static str,
    pub merge: MergeKind,
    pub stored: StoredType,
    pub default: FieldDefault,
}

impl FieldDescriptor {
    const fn scalar(name: &'static str, label: &'static str, stored: StoredType) -> Self {
        Self {
            name,
            label,
            merge: MergeKind::Scalar,
            stored,
            default: FieldDefault::EmptyText,
        }
    }

    pub fn default_value(&self) -> Value {
        self.default.to_value()
    }
}

/// Canonical fields in storage order.
pub static FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::scalar("name", "회사명", StoredType::Text),
    FieldDescriptor::scalar("established_year", "설립 연도", StoredType::Integer),
    FieldDescriptor::scalar("company_type", "회사 유형", StoredType::Text),
    FieldDescriptor {
        name: "is_listed",
        label: "상장 여부",
        merge: MergeKind::Flag,
        stored: StoredType::Boolean,
        default: FieldDefault::False,
    },
    FieldDescriptor::scalar("homepage", "홈페이지", StoredType::Text),
    FieldDescriptor::scalar("description", "회사 설명", StoredType::Text),
    FieldDescriptor::scalar("address", "주소", StoredType::Text),
    FieldDescriptor::scalar("industry", "산업 분야", StoredType::TextList { split: false }),
    FieldDescriptor::scalar(
        "products_services",
        "제품/서비스",
        StoredType::TextList { split: true },
    ),
    FieldDescriptor::scalar("key_executive", "대표자", StoredType::Text),
    FieldDescriptor::scalar("employee_count", "직원 수", StoredType::Headcount),
    FieldDescriptor::scalar("employee_history", "직원 수 추이", StoredType::Json),
    FieldDescriptor::scalar("latest_revenue", "최근 매출액", StoredType::Decimal),
    FieldDescriptor::scalar("latest_operating_income", "최근 영업이익", StoredType::Decimal),
    FieldDescriptor::scalar("latest_net_income", "최근 순이익", StoredType::Decimal),
    FieldDescriptor::scalar("latest_fiscal_year", "최근 회계연도", StoredType::Integer),
    FieldDescriptor {
        name: "financial_history",
        label: "재무 정보 히스토리",
        merge: MergeKind::YearMetricTable,
        stored: StoredType::FinancialTable,
        default: FieldDefault::EmptyMapping,
    },
    FieldDescriptor::scalar("total_funding", "총 투자 유치 금액", StoredType::Decimal),
    FieldDescriptor::scalar("latest_funding_round", "최근 투자 라운드", StoredType::Text),
    FieldDescriptor::scalar("latest_funding_date", "최근 투자 날짜", StoredType::Date),
    FieldDescriptor::scalar("latest_valuation", "최근 기업가치", StoredType::Decimal),
    FieldDescriptor::scalar("investment_history", "투자 히스토리", StoredType::Json),
    FieldDescriptor::scalar("investors", "주요 투자자", StoredType::Json),
    FieldDescriptor::scalar("market_cap", "시가총액", StoredType::Decimal),
    FieldDescriptor::scalar("stock_ticker", "종목 코드", StoredType::Text),
    FieldDescriptor::scalar("stock_exchange", "증권거래소", StoredType::Text),
    FieldDescriptor::scalar("patent_count", "특허 수", StoredType::Integer),
    FieldDescriptor::scalar("trademark_count", "상표 수", StoredType::Integer),
    FieldDescriptor::scalar("ip_details", "지식재산 상세", StoredType::Json),
    FieldDescriptor::scalar("tech_stack", "기술 스택", StoredType::Json),
    FieldDescriptor::scalar("recent_news", "최근 뉴스", StoredType::Json),
    FieldDescriptor::scalar("target_customers", "목표 고객층", StoredType::Text),
    FieldDescriptor::scalar("competitors", "경쟁사", StoredType::Text),
    FieldDescriptor::scalar("strengths", "강점", StoredType::Text),
    FieldDescriptor::scalar("risk_factors", "위험 요인", StoredType::Text),
    FieldDescriptor::scalar("recent_trends", "최근 동향", StoredType::Text),
];

/// Look up a field by name.
pub fn field(name: &str) -> Option<&'static FieldDescriptor> {
    FIELDS.iter().find(|f| f.name == name)
}
