//! Repeatable sections: work experience, education, projects.
//!
//! "Add" controls are clicked (with a settle delay) until the rendered
//! section count covers the profile entries, clicks bounded so a broken add
//! button can't loop forever. Sections map to entries strictly by position;
//! each section is filled through a category-local keyword table scoped to
//! its own subtree.

use std::time::Duration;

use tracing::{debug, info};

use crate::engine::driver::PageDriver;
use crate::engine::setter::{match_select_option, DomAction};
use crate::engine::snapshot::{ControlKind, ControlSnapshot};
use crate::profile::{EducationExperience, Profile, ProjectExperience, WorkExperience};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionCategory {
    Work,
    Education,
    Projects,
}

impl SectionCategory {
    pub fn slug(&self) -> &'static str {
        match self {
            SectionCategory::Work => "work",
            SectionCategory::Education => "edu",
            SectionCategory::Projects => "proj",
        }
    }

    /// Header keywords that identify a rendered section of this category.
    pub fn header_keywords(&self) -> &'static [&'static str] {
        match self {
            SectionCategory::Work => &["work experience", "experience"],
            SectionCategory::Education => &["education"],
            SectionCategory::Projects => &["project"],
        }
    }

    /// An add control must contain "add" plus one of these.
    fn add_needles(&self) -> &'static [&'static str] {
        match self {
            SectionCategory::Work => &["experience", "work"],
            SectionCategory::Education => &["education", "school"],
            SectionCategory::Projects => &["project"],
        }
    }

    fn add_settle(&self) -> Duration {
        match self {
            SectionCategory::Work => Duration::from_millis(800),
            _ => Duration::from_millis(600),
        }
    }

    /// Phrases marking the "still active" checkbox inside a section.
    fn still_active_phrases(&self) -> &'static [&'static str] {
        match self {
            SectionCategory::Work => &["currently work", "present"],
            SectionCategory::Education => &["currently studying", "in progress"],
            SectionCategory::Projects => &[],
        }
    }
}

/// One profile entry, category-erased for the shared fill path.
pub enum EntryRef<'a> {
    Work(&'a WorkExperience),
    Education(&'a EducationExperience),
    Project(&'a ProjectExperience),
}

impl<'a> EntryRef<'a> {
    /// Category-local keyword table: hint → entry field. Longest keyword
    /// first, same precedence rule as the global table.
    pub fn value_for(&self, hint: &str) -> Option<String> {
        let table: Vec<(&str, Option<String>)> = match self {
            EntryRef::Work(w) => vec![
                ("job title", w.job_title.clone()),
                ("title", w.job_title.clone()),
                ("position", w.job_title.clone()),
                ("company", w.company_name.clone()),
                ("employer", w.company_name.clone()),
                ("location", w.location.clone()),
                ("description", w.description.clone()),
                ("start date", w.start_date.clone()),
                ("end date", w.end_date.clone()),
                ("from", w.start_date.clone()),
                ("to", w.end_date.clone()),
                ("work type", w.work_type.clone()),
            ],
            EntryRef::Education(e) => vec![
                ("school", e.college_name.clone()),
                ("university", e.college_name.clone()),
                ("institution", e.college_name.clone()),
                (
                    "degree",
                    e.education_type
                        .clone()
                        .or_else(|| Some("Bachelor".to_string())),
                ),
                ("field", e.field.clone()),
                ("major", e.field.clone()),
                ("start date", e.start_date.clone()),
                ("end date", e.end_date.clone()),
                ("from", e.start_date.clone()),
                ("to", e.end_date.clone()),
                ("grade", e.grade.clone()),
                ("gpa", e.grade.clone()),
                ("location", e.location.clone()),
                ("description", e.description.clone()),
            ],
            EntryRef::Project(p) => vec![
                ("project", p.project_name.clone()),
                ("name", p.project_name.clone()),
                ("start date", p.start_date.clone()),
                ("end date", p.end_date.clone()),
                ("from", p.start_date.clone()),
                ("to", p.end_date.clone()),
                ("description", p.description.clone()),
                ("github", p.git_url.clone()),
                ("url", p.host_url.clone()),
                ("link", p.host_url.clone()),
            ],
        };

        let mut order: Vec<usize> = (0..table.len()).collect();
        order.sort_by(|a, b| table[*b].0.len().cmp(&table[*a].0.len()));
        for i in order {
            let (keyword, value) = &table[i];
            if hint.contains(keyword) {
                if let Some(v) = value.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    return Some(v.to_string());
                }
            }
        }
        None
    }

    fn description(&self) -> Option<&str> {
        match self {
            EntryRef::Work(w) => w.description.as_deref(),
            EntryRef::Education(e) => e.description.as_deref(),
            EntryRef::Project(p) => p.description.as_deref(),
        }
    }

    fn still_active(&self) -> Option<bool> {
        match self {
            EntryRef::Work(w) => w.still_working,
            EntryRef::Education(e) => e.still_studying,
            EntryRef::Project(_) => None,
        }
    }
}

/// Plan the action for one control inside a section. Pure, mirroring the
/// generic type rules minus radios/checkboxes (the still-active checkbox is
/// handled separately by phrase search).
pub fn plan_section_action(control: &ControlSnapshot, entry: &EntryRef<'_>) -> Option<DomAction> {
    let hint = control.hint_lower();
    if hint.is_empty() {
        return None;
    }
    let sel = control.sel.clone();
    let kind = control.classify();

    let mut value = entry.value_for(&hint);
    if value.is_none() && kind == ControlKind::TextArea {
        value = entry.description().map(str::to_string);
    }
    let value = value?;

    match kind {
        ControlKind::Checkbox | ControlKind::Radio | ControlKind::Combobox => None,
        ControlKind::Select => match_select_option(&control.options, &value)
            .map(|option_index| DomAction::SelectOption { sel, option_index }),
        _ => Some(DomAction::SetValue { sel, value }),
    }
}

// ── Page-side discovery ──────────────────────────────────────────────────────

const SECTION_STAMP_TEMPLATE: &str = r#"
(() => {
    const keywords = __KEYWORDS__;
    const slug = __SLUG__;
    const all = Array.from(document.querySelectorAll('section, div'));
    const cands = [];
    for (const node of all) {
        const header = node.querySelector('h1,h2,h3,h4,[role="heading"]');
        const t = header ? (header.textContent || '').trim().toLowerCase() : '';
        if (t && keywords.some(k => t.includes(k))) cands.push(node);
    }
    // Innermost wins: drop any candidate that wraps another candidate.
    const keep = cands.filter(a => !cands.some(b => b !== a && a !== b && a.contains(b)));
    return keep.map((node, i) => {
        const id = slug + '-' + i;
        node.setAttribute('data-fp-section', id);
        return id;
    });
})()
"#;

/// Stamp rendered sections of a category, returning their root ids in
/// document order.
async fn stamp_sections(driver: &PageDriver, category: SectionCategory) -> Vec<String> {
    let js = SECTION_STAMP_TEMPLATE
        .replace(
            "__KEYWORDS__",
            &serde_json::to_string(category.header_keywords()).unwrap(),
        )
        .replace("__SLUG__", &serde_json::to_string(category.slug()).unwrap());
    match driver.eval_json(js).await {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

async fn click_add_button(driver: &PageDriver, category: SectionCategory) -> bool {
    let js = format!(
        r#"(() => {{
            const needles = {needles};
            const btns = Array.from(document.querySelectorAll("button, [role='button'], a"));
            const hit = btns.find(b => {{
                const t = (b.textContent || '').trim().toLowerCase();
                return t.includes('add') && needles.some(k => t.includes(k));
            }});
            if (hit) {{ hit.click(); return true; }}
            return false;
        }})()"#,
        needles = serde_json::to_string(category.add_needles()).unwrap(),
    );
    driver.eval_bool(js).await
}

/// Click the add control until enough sections exist. Clicks are bounded — a
/// button that never yields a new section is abandoned, and whatever sections
/// exist are filled as-is.
async fn ensure_section_count(driver: &PageDriver, category: SectionCategory, needed: usize) {
    let max_clicks = needed * 2 + 2;
    for _ in 0..max_clicks {
        let count = stamp_sections(driver, category).await.len();
        if count >= needed {
            return;
        }
        if !click_add_button(driver, category).await {
            debug!("{}: no add control found", category.slug());
            return;
        }
        tokio::time::sleep(category.add_settle()).await;
    }
}

async fn set_still_active_checkbox(
    driver: &PageDriver,
    root_selector: &str,
    category: SectionCategory,
    still: bool,
) {
    let phrases = category.still_active_phrases();
    if phrases.is_empty() {
        return;
    }
    let controls = driver.harvest(Some(root_selector)).await;
    let target = controls.iter().find(|c| {
        c.classify() == ControlKind::Checkbox
            && phrases.iter().any(|p| c.hint_lower().contains(p))
    });
    if let Some(c) = target {
        driver
            .apply(&DomAction::SetChecked {
                sel: c.sel.clone(),
                checked: still,
            })
            .await;
    }
}

/// Fill every rendered section of a category from the profile entries,
/// strictly by position. Never touches a section index beyond either list.
pub async fn fill_category(driver: &PageDriver, profile: &Profile, category: SectionCategory) {
    let entries: Vec<EntryRef<'_>> = match category {
        SectionCategory::Work => profile.work_experiences.iter().map(EntryRef::Work).collect(),
        SectionCategory::Education => profile
            .education_experiences
            .iter()
            .map(EntryRef::Education)
            .collect(),
        SectionCategory::Projects => profile
            .project_experiences
            .iter()
            .map(EntryRef::Project)
            .collect(),
    };
    if entries.is_empty() {
        return;
    }

    ensure_section_count(driver, category, entries.len()).await;
    let roots = stamp_sections(driver, category).await;
    if roots.is_empty() {
        return;
    }

    let filled = roots.len().min(entries.len());
    for (root_id, entry) in roots.iter().zip(entries.iter()).take(filled) {
        let root_selector = format!("[data-fp-section=\"{root_id}\"]");
        let controls = driver.harvest(Some(&root_selector)).await;
        for control in &controls {
            if let Some(action) = plan_section_action(control, entry) {
                driver.apply(&action).await;
            }
        }
        if let Some(still) = entry.still_active() {
            set_still_active_checkbox(driver, &root_selector, category, still).await;
        }
    }
    info!("{}: filled {} of {} sections", category.slug(), filled, roots.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work_entry() -> WorkExperience {
        WorkExperience {
            job_title: Some("Systems Engineer".into()),
            company_name: Some("Acme".into()),
            start_date: Some("2019-02-01".into()),
            end_date: Some("2022-06-30".into()),
            description: Some("Built things.".into()),
            still_working: Some(false),
            ..Default::default()
        }
    }

    #[test]
    fn job_title_beats_bare_title_keyword() {
        let w = work_entry();
        let entry = EntryRef::Work(&w);
        assert_eq!(entry.value_for("job title").unwrap(), "Systems Engineer");
        assert_eq!(entry.value_for("title of role").unwrap(), "Systems Engineer");
        assert_eq!(entry.value_for("employer name").unwrap(), "Acme");
    }

    #[test]
    fn from_to_map_to_start_end_dates() {
        let w = work_entry();
        let entry = EntryRef::Work(&w);
        assert_eq!(entry.value_for("from").unwrap(), "2019-02-01");
        assert_eq!(entry.value_for("to").unwrap(), "2022-06-30");
    }

    #[test]
    fn education_degree_defaults_to_bachelor() {
        let e = EducationExperience::default();
        let entry = EntryRef::Education(&e);
        assert_eq!(entry.value_for("degree").unwrap(), "Bachelor");
    }

    #[test]
    fn textarea_falls_back_to_description() {
        let w = work_entry();
        let control = ControlSnapshot {
            sel: "s0:0".into(),
            tag: "textarea".into(),
            hint: "Tell us more".into(),
            ..Default::default()
        };
        match plan_section_action(&control, &EntryRef::Work(&w)) {
            Some(DomAction::SetValue { value, .. }) => assert_eq!(value, "Built things."),
            other => panic!("expected SetValue, got {other:?}"),
        }
    }

    #[test]
    fn positional_bound_never_exceeds_either_list() {
        // Three rendered sections, two entries → exactly two pairs filled;
        // one rendered section, two entries → one pair.
        let roots = ["work-0", "work-1", "work-2"];
        let entries = [work_entry(), work_entry()];
        let filled = roots.len().min(entries.len());
        assert_eq!(filled, 2);
        let pairs: Vec<_> = roots.iter().zip(entries.iter()).take(filled).collect();
        assert_eq!(pairs.len(), 2);

        let one_root = ["work-0"];
        assert_eq!(one_root.len().min(entries.len()), 1);
    }
}
