use crate::catalog::schema::{Criterion, Tag, Tool};

pub const SCALABILITY: &str = "scalability";
pub const INTEGRATIONS: &str = "integrations";
pub const EASE_OF_USE: &str = "ease_of_use";
pub const FLEXIBILITY: &str = "flexibility";
pub const PORTFOLIO: &str = "portfolio_management";
pub const REPORTING: &str = "reporting";
pub const SECURITY: &str = "security";

const CRITERIA: [(&str, &str, &str); 7] = [
    (
        SCALABILITY,
        "Scalability",
        "Ability to grow with the number of users, projects and portfolios.",
    ),
    (
        INTEGRATIONS,
        "Integrations & Extensibility",
        "Connectors, APIs and marketplace apps for the rest of the stack.",
    ),
    (
        EASE_OF_USE,
        "Ease of Use",
        "How quickly teams become productive without dedicated admins.",
    ),
    (
        FLEXIBILITY,
        "Flexibility & Customization",
        "Custom fields, workflows and views that fit the way you work.",
    ),
    (
        PORTFOLIO,
        "Portfolio Management",
        "Cross-project prioritization, capacity and resource planning.",
    ),
    (
        REPORTING,
        "Reporting & Analytics",
        "Dashboards, roll-ups and exportable portfolio reporting.",
    ),
    (
        SECURITY,
        "Security & Compliance",
        "SSO, audit logs, data residency and certifications.",
    ),
];

/// Criteria the finder starts with, every importance at the midpoint.
pub fn default_criteria() -> Vec<Criterion> {
    CRITERIA
        .iter()
        .map(|(id, name, description)| Criterion::new(*id, *name, 3).with_description(description))
        .collect()
}

fn criterion_name(id: &str) -> &'static str {
    CRITERIA
        .iter()
        .find(|(cid, _, _)| *cid == id)
        .map(|(_, name, _)| *name)
        .unwrap_or("Unknown")
}

fn rated(tool: Tool, ratings: [u8; 7]) -> Tool {
    CRITERIA
        .iter()
        .zip(ratings)
        .fold(tool, |tool, ((id, _, _), rating)| {
            tool.with_rating(id, criterion_name(id), rating)
        })
}

/// Built-in tool catalog, ratings ordered as the criteria above.
pub fn default_tools() -> Vec<Tool> {
    vec![
        rated(
            Tool::new("smartsheet", "Smartsheet")
                .with_logo("/logos/smartsheet.png")
                .with_tag(Tag::methodology("Waterfall"))
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Hybrid"))
                .with_tag(Tag::function("Portfolio Management"))
                .with_use_case("Enterprise PMO reporting"),
            [4, 4, 4, 4, 4, 4, 4],
        ),
        rated(
            Tool::new("airtable", "Airtable")
                .with_logo("/logos/airtable.png")
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Kanban"))
                .with_tag(Tag::function("Work Management"))
                .with_use_case("Custom tracking databases"),
            [3, 4, 4, 5, 2, 3, 3],
        ),
        rated(
            Tool::new("asana", "Asana")
                .with_logo("/logos/asana.png")
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Kanban"))
                .with_tag(Tag::methodology("Waterfall"))
                .with_tag(Tag::function("Work Management"))
                .with_use_case("Cross-functional team coordination"),
            [4, 4, 5, 3, 3, 3, 4],
        ),
        rated(
            Tool::new("jira", "Jira")
                .with_logo("/logos/jira.png")
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Scrum"))
                .with_tag(Tag::methodology("Kanban"))
                .with_tag(Tag::function("Software Delivery"))
                .with_use_case("Software development teams"),
            [5, 5, 3, 5, 3, 4, 4],
        ),
        rated(
            Tool::new("monday", "Monday.com")
                .with_logo("/logos/monday.png")
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Kanban"))
                .with_tag(Tag::methodology("Hybrid"))
                .with_tag(Tag::function("Work Management"))
                .with_use_case("Visual team workflows"),
            [4, 4, 5, 4, 3, 4, 4],
        ),
        rated(
            Tool::new("clickup", "ClickUp")
                .with_logo("/logos/clickup.png")
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Scrum"))
                .with_tag(Tag::methodology("Kanban"))
                .with_tag(Tag::methodology("Waterfall"))
                .with_tag(Tag::function("Work Management"))
                .with_use_case("All-in-one workspace for small teams"),
            [4, 4, 3, 5, 3, 4, 3],
        ),
        rated(
            Tool::new("ms_project", "Microsoft Project")
                .with_logo("/logos/ms-project.png")
                .with_tag(Tag::methodology("Waterfall"))
                .with_tag(Tag::methodology("Hybrid"))
                .with_tag(Tag::function("Scheduling"))
                .with_use_case("Schedule-driven delivery"),
            [4, 3, 2, 3, 4, 4, 5],
        ),
        rated(
            Tool::new("planview", "Planview")
                .with_logo("/logos/planview.png")
                .with_tag(Tag::methodology("Waterfall"))
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Hybrid"))
                .with_tag(Tag::function("Portfolio Management"))
                .with_use_case("Strategic portfolio management"),
            [5, 4, 2, 4, 5, 5, 5],
        ),
        rated(
            Tool::new("wrike", "Wrike")
                .with_logo("/logos/wrike.png")
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Waterfall"))
                .with_tag(Tag::methodology("Hybrid"))
                .with_tag(Tag::function("Work Management"))
                .with_use_case("Marketing and professional services"),
            [4, 4, 3, 4, 4, 4, 4],
        ),
        rated(
            Tool::new("azure_devops", "Azure DevOps")
                .with_logo("/logos/azure-devops.png")
                .with_tag(Tag::methodology("Agile"))
                .with_tag(Tag::methodology("Scrum"))
                .with_tag(Tag::function("Software Delivery"))
                .with_use_case("Engineering organizations on Microsoft stack"),
            [5, 4, 2, 4, 2, 3, 5],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tool_rates_every_default_criterion() {
        let criteria = default_criteria();
        for tool in default_tools() {
            assert_eq!(tool.criteria.len(), criteria.len(), "{}", tool.name);
            for criterion in &criteria {
                assert!(tool.criteria.iter().any(|r| r.id == criterion.id));
            }
        }
    }

    #[test]
    fn tool_ids_are_unique() {
        let tools = default_tools();
        let mut ids = tools.iter().map(|t| t.id.as_str()).collect::<Vec<_>>();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), tools.len());
    }
}
