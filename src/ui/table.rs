use tabled::{settings::Style, Table, Tabled};

use crate::post::Post;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct PostRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Likes")]
    likes: u32,
    #[tabled(rename = "Comments")]
    comments: u32,
}

/// Render posts as a table, one row per post, in the given order
pub fn posts_table(posts: &[Post]) -> String {
    if posts.is_empty() {
        return String::new();
    }

    let rows: Vec<PostRow> = posts
        .iter()
        .map(|p| PostRow {
            id: p.id.clone(),
            title: p.title.clone(),
            category: p.category.clone(),
            date: p.date.format("%Y-%m-%d").to_string(),
            likes: p.likes,
            comments: p.comments,
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}
