//! The interactive loop and what each command does

use anyhow::Result;
use log::debug;
use remote_tree::prelude::*;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::command::{Command, HELP};

/// Asks on stdin which of several search candidates was meant
struct PromptChooser;

impl Chooser for PromptChooser {
    fn choose_index(&self, candidates: &[Metadata]) -> usize {
        println!("{} matches:", candidates.len());
        for (i, meta) in candidates.iter().enumerate() {
            let parent = meta.parent.as_ref().map_or("-", ResourceId::as_str);
            println!("  [{i}] {} ({}, in {parent})", meta.name, meta.id);
        }
        print!("pick one: ");
        let _ = io::stdout().flush();

        // Resolution runs on a runtime worker; let it hand off other tasks
        match tokio::task::block_in_place(read_line) {
            Ok(Some(answer)) => parse_choice(&answer, candidates.len()),
            _ => candidates.len(),
        }
    }
}

/// Index typed by the user, or `count` (out of range) when unparsable
fn parse_choice(answer: &str, count: usize) -> usize {
    answer.trim().parse().unwrap_or(count)
}

/// One line of stdin, `None` at end of input
fn read_line() -> io::Result<Option<String>> {
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

pub struct Shell {
    navigator: Navigator,
}

impl Shell {
    pub fn new(navigator: Navigator) -> Self {
        Self { navigator }
    }

    fn prompt(&self) -> String {
        format!("{}> ", self.navigator.pwd().unwrap_or_default())
    }

    /// Read commands until `quit` or end of input
    pub async fn run(&self) -> Result<()> {
        loop {
            print!("{}", self.prompt());
            io::stdout().flush()?;

            let Some(line) = tokio::task::spawn_blocking(read_line).await?? else {
                println!();
                return Ok(());
            };
            if line.trim().is_empty() {
                continue;
            }

            let outcome = match line.parse::<Command>() {
                Ok(command) => self.execute(command).await,
                Err(err) => Err(err),
            };
            match outcome {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(err) => eprintln!("error: {err:#}"),
            }
        }
    }

    fn current(&self) -> Result<Arc<Node>> {
        self.navigator
            .current()
            .ok_or_else(|| anyhow::anyhow!("no root to browse"))
    }

    /// Run one command; returns false when the shell should stop
    pub async fn execute(&self, command: Command) -> Result<bool> {
        debug!("executing {:?}", command);
        match command {
            Command::Roots => {
                let current = self.navigator.current_root();
                for root in self.navigator.forest().roots() {
                    let marker = match &current {
                        Some(c) if Arc::ptr_eq(c, &root) => "*",
                        _ => " ",
                    };
                    println!("{marker} {} ({})", root.name(), root.id());
                }
            }
            Command::Root(id) => {
                let root = self.navigator.switch_root(&ResourceId::new(id)).await?;
                println!("{}", root.name());
            }
            Command::Ls => {
                let current = self.current()?;
                self.navigator
                    .load_children(&current, LoadScope::ALL)
                    .await?;
                for child in current.children() {
                    print_entry(&child);
                }
            }
            Command::Cd(query) => {
                let node = self.navigator.change_directory(&query).await?;
                println!("{}", node.path());
            }
            Command::Pwd => println!("{}", self.navigator.pwd().unwrap_or_default()),
            Command::Find(query) => {
                let node = self.navigator.find_local(&query, None)?;
                println!("{}", node.path());
            }
            Command::Resolve { query, fresh, meta } => {
                let opts = ResolveOptions::new()
                    .skip_cache(fresh)
                    .materialize_path(!meta)
                    .chooser(PromptChooser);
                match self.navigator.resolve_global(&query, &opts).await? {
                    Resolved::Node(node) => println!("{}", node.path()),
                    Resolved::Metadata(meta) => println!(
                        "{} {} ({}) parent {}",
                        meta.kind,
                        meta.name,
                        meta.id,
                        meta.parent.as_ref().map_or("-", ResourceId::as_str)
                    ),
                }
            }
            Command::Cat(query) => {
                let body = self.navigator.read_entry(&query).await?;
                for row in &body.rows {
                    println!("{}", row.join(", "));
                }
            }
            Command::Mkdir(name) => {
                let node = self
                    .navigator
                    .create_container(&self.current()?, &name)
                    .await?;
                println!("{}", node.path());
            }
            Command::Touch { name, leaf_type } => {
                let node = self
                    .navigator
                    .create_leaf(&self.current()?, &name, leaf_type)
                    .await?;
                println!("{}", node.path());
            }
            Command::Tree => print!("{}", format_tree(&self.current()?)),
            Command::Help => println!("{HELP}"),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }
}

fn print_entry(node: &Node) {
    match node.leaf_type() {
        None => println!("  {}/  ({})", node.name(), node.id()),
        Some(leaf_type) => println!("  {}  ({}, {:?})", node.name(), node.id(), leaf_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_client;
    use pretty_assertions::assert_eq;

    async fn shell() -> Shell {
        let nav = Navigator::connect(Arc::new(demo_client()), NavigatorConfig::default())
            .await
            .unwrap();
        Shell::new(nav)
    }

    #[tokio::test]
    async fn test_browse_commands() {
        let shell = shell().await;
        assert!(shell.execute(Command::Cd("Finance".into())).await.unwrap());
        assert!(shell.execute(Command::Ls).await.unwrap());
        assert_eq!(shell.prompt(), "Workspace/Finance> ");

        shell.execute(Command::Cd("..".into())).await.unwrap();
        assert_eq!(shell.navigator.pwd().unwrap(), "Workspace");
        assert!(!shell.execute(Command::Quit).await.unwrap());
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1\n", 3), 1);
        assert_eq!(parse_choice("  0 ", 3), 0);
        assert_eq!(parse_choice("first", 3), 3);
        assert_eq!(parse_choice("-1", 3), 3);
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_the_shell() {
        let shell = shell().await;
        assert!(shell.execute(Command::Cd("Nowhere".into())).await.is_err());
        assert!(shell.execute(Command::Cat("Readme".into())).await.is_err());
        assert!(shell.execute(Command::Pwd).await.unwrap());
    }

    #[tokio::test]
    async fn test_switch_root_and_create() {
        let shell = shell().await;
        shell.execute(Command::Root("ar".into())).await.unwrap();
        shell
            .execute(Command::Mkdir("2020".into()))
            .await
            .unwrap();
        shell.execute(Command::Cd("2020".into())).await.unwrap();
        assert_eq!(shell.navigator.pwd().unwrap(), "Archive/2020");
    }
}
