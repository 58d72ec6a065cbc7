pub mod dashboard;
pub mod dates;
pub mod statistics;
pub mod submission;
pub mod trends;

pub use dashboard::*;
pub use dates::*;
pub use statistics::*;
pub use submission::*;
pub use trends::*;

use serde::Serialize;

use crate::checklist::ChecklistData;
use crate::constants::ChecklistCategory;

/// Labels and values of one chart series, serialized as `{labels, data}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries<T> {
    pub labels: Vec<String>,
    pub data: Vec<T>,
}

impl<T> ChartSeries<T> {
    pub fn push(&mut self, label: impl Into<String>, value: T) {
        self.labels.push(label.into());
        self.data.push(value);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistItemView {
    pub name: String,
    pub checked: bool,
}

/// A checklist category laid out for display or for the submission form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryView {
    pub name: String,
    pub items: Vec<ChecklistItemView>,
    pub other_checked: bool,
    pub other_text: String,
}

pub fn category_views(data: &ChecklistData, taxonomy: &[ChecklistCategory]) -> Vec<CategoryView> {
    taxonomy
        .iter()
        .map(|category| CategoryView {
            name: category.name.to_string(),
            items: category
                .items
                .iter()
                .map(|item| ChecklistItemView {
                    name: item.to_string(),
                    checked: data.is_checked(item),
                })
                .collect(),
            other_checked: data.other_checked(category.name),
            other_text: data.other_text(category.name).to_string(),
        })
        .collect()
}
