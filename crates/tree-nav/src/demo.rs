//! Built-in tree for trying the shell without a real store

use remote_tree::prelude::*;

fn table(rows: &[&[&str]]) -> Body {
    Body::new(
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
}

/// Two roots; `Report` exists twice so `resolve Report` has to ask
pub fn demo_client() -> MemoryClient {
    MemoryClient::new()
        .with_root("ws", "Workspace")
        .with_container("ws", "ws-finance", "Finance")
        .with_container("ws-finance", "ws-2024", "2024")
        .with_leaf("ws-2024", "ws-budget", "Budget", LeafType::Table)
        .with_leaf("ws-2024", "ws-report", "Report", LeafType::Document)
        .with_container("ws", "ws-team", "Team")
        .with_leaf("ws-team", "ws-roster", "Roster", LeafType::Table)
        .with_leaf("ws", "ws-readme", "Readme", LeafType::Document)
        .with_root("ar", "Archive")
        .with_container("ar", "ar-2019", "2019")
        .with_leaf("ar-2019", "ar-report", "Report", LeafType::Document)
        .with_leaf("ar-2019", "ar-logo", "logo.png", LeafType::Binary)
        .with_content(
            "ws-budget",
            table(&[
                &["item", "q1", "q2"],
                &["hosting", "1200", "1350"],
                &["travel", "400", "250"],
            ]),
        )
        .with_content(
            "ws-roster",
            table(&[&["name", "role"], &["Ada", "lead"], &["Lin", "ops"]]),
        )
}
