use catalog::Edit;

/// Fields for `curate add`, before sanitizing.
#[derive(Debug, Clone, Default)]
pub struct NewEdit {
    pub title: String,
    pub anime: String,
    pub category: String,
    pub video_url: String,
    pub tags: Vec<String>,
}

pub fn format_edit(edit: &Edit) -> String {
    format!(
        "{:>3}  {:<40} {:<18} [{}] {}",
        edit.id,
        edit.title,
        edit.anime,
        edit.category,
        edit.tags.join(", ")
    )
}
