// Report content model: the contract between the page generators and
// the two exporters. Each block kind is a tagged variant so both
// renderers handle every kind exhaustively at compile time.
use crate::narrative::Narrative;
use serde::Serialize;

/// Labeled value shown in a metric block. Values arrive preformatted;
/// no renderer performs unit conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Metric {
        Metric {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// One labeled data series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<(String, f64)>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(String, f64)>) -> Series {
        Series {
            label: label.into(),
            points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Bar { horizontal: bool },
    GroupedBar,
    Pie,
}

/// Abstract chart description: only the produced chart's data matters,
/// rasterization is the charts module's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub series: Vec<Series>,
}

impl ChartSpec {
    pub fn bar(title: impl Into<String>, points: Vec<(String, f64)>) -> ChartSpec {
        ChartSpec {
            title: title.into(),
            kind: ChartKind::Bar { horizontal: false },
            series: vec![Series::new("", points)],
        }
    }

    pub fn horizontal_bar(title: impl Into<String>, points: Vec<(String, f64)>) -> ChartSpec {
        ChartSpec {
            title: title.into(),
            kind: ChartKind::Bar { horizontal: true },
            series: vec![Series::new("", points)],
        }
    }

    pub fn grouped_bar(title: impl Into<String>, series: Vec<Series>) -> ChartSpec {
        ChartSpec {
            title: title.into(),
            kind: ChartKind::GroupedBar,
            series,
        }
    }

    pub fn pie(title: impl Into<String>, points: Vec<(String, f64)>) -> ChartSpec {
        ChartSpec {
            title: title.into(),
            kind: ChartKind::Pie,
            series: vec![Series::new("", points)],
        }
    }
}

/// Tabular result shown under a section. Renderers cap the displayed
/// rows at `MAX_TABLE_ROWS` with a visible truncation notice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub const MAX_TABLE_ROWS: usize = 50;

/// One content block. Order within a section is meaningful: metrics
/// before charts before tables, mirroring the narrative flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    Metrics(Vec<Metric>),
    Chart(ChartSpec),
    Table(ResultTable),
    Text(Narrative),
}

/// Atomic unit of the report: an optional heading plus ordered blocks.
/// An absent piece simply emits nothing in every renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Section {
    pub title: Option<String>,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn titled(title: impl Into<String>) -> Section {
        Section {
            title: Some(title.into()),
            blocks: Vec::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Vec<Metric>) -> Section {
        self.blocks.push(Block::Metrics(metrics));
        self
    }

    pub fn with_chart(mut self, chart: ChartSpec) -> Section {
        self.blocks.push(Block::Chart(chart));
        self
    }

    pub fn with_table(mut self, table: ResultTable) -> Section {
        self.blocks.push(Block::Table(table));
        self
    }

    pub fn with_text(mut self, raw: &str) -> Section {
        self.blocks.push(Block::Text(Narrative::parse(raw)));
        self
    }
}

/// Ordered sections for one page.
pub type Report = Vec<Section>;

/// Full-export content: page title → that page's sections, insertion
/// order = canonical page order.
pub type StructuredReport = Vec<(String, Report)>;

/// What an exporter receives alongside the raw datasets.
#[derive(Debug, Clone)]
pub enum ReportContent {
    Single(Report),
    Structured(StructuredReport),
}
