//! Parsing of command-line arguments and shell commands

use anyhow::{bail, Context, Result};
use remote_tree::prelude::LeafType;
use std::path::PathBuf;
use std::str::FromStr;

pub const USAGE: &str = "usage: tree-nav [--config FILE] [--demo] [DIR...]";

pub const HELP: &str = "\
commands:
  roots                          list forest roots
  root <id>                      switch to a root, admitting it if needed
  ls                             load and list the current container
  cd <name|id|..|/>              change the current container
  pwd                            print the current path
  find <name|id>                 search what is already loaded below here
  resolve <q> [--fresh] [--meta] find anywhere, loading only the path to it
  cat <name|id>                  print a table leaf near here
  mkdir <name>                   create a container here
  touch <name> [table|document]  create a leaf here
  tree                           show what is loaded below here
  help                           show this text
  quit                           leave";

/// Start-up options
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub demo: bool,
    pub dirs: Vec<PathBuf>,
}

impl Args {
    /// Parse arguments, excluding the program name
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config needs a file")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--demo" => parsed.demo = true,
                "-h" | "--help" => bail!("{USAGE}"),
                flag if flag.starts_with("--") => bail!("unknown option {flag}\n{USAGE}"),
                dir => parsed.dirs.push(PathBuf::from(dir)),
            }
        }

        if parsed.demo && !parsed.dirs.is_empty() {
            bail!("--demo cannot be combined with directories");
        }
        Ok(parsed)
    }
}

/// One line typed into the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Roots,
    Root(String),
    Ls,
    Cd(String),
    Pwd,
    Find(String),
    Resolve {
        query: String,
        fresh: bool,
        meta: bool,
    },
    Cat(String),
    Mkdir(String),
    Touch {
        name: String,
        leaf_type: LeafType,
    },
    Tree,
    Help,
    Quit,
}

fn one_arg(command: &str, rest: &[&str]) -> Result<String> {
    match rest {
        [arg] => Ok(arg.to_string()),
        _ => bail!("{command} takes exactly one argument"),
    }
}

fn parse_leaf_type(word: &str) -> Result<LeafType> {
    match word {
        "table" => Ok(LeafType::Table),
        "document" | "doc" => Ok(LeafType::Document),
        "binary" => Ok(LeafType::Binary),
        other => bail!("unknown leaf type {other}"),
    }
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else {
            bail!("empty command");
        };

        let parsed = match command {
            "roots" => Command::Roots,
            "root" => Command::Root(one_arg(command, rest)?),
            "ls" => Command::Ls,
            "cd" => Command::Cd(one_arg(command, rest)?),
            "pwd" => Command::Pwd,
            "find" => Command::Find(one_arg(command, rest)?),
            "resolve" => {
                let mut query = None;
                let mut fresh = false;
                let mut meta = false;
                for word in rest {
                    match *word {
                        "--fresh" => fresh = true,
                        "--meta" => meta = true,
                        q if query.is_none() => query = Some(q.to_string()),
                        extra => bail!("unexpected argument {extra}"),
                    }
                }
                Command::Resolve {
                    query: query.context("resolve needs a query")?,
                    fresh,
                    meta,
                }
            }
            "cat" => Command::Cat(one_arg(command, rest)?),
            "mkdir" => Command::Mkdir(one_arg(command, rest)?),
            "touch" => match rest {
                [name] => Command::Touch {
                    name: name.to_string(),
                    leaf_type: LeafType::Document,
                },
                [name, kind] => Command::Touch {
                    name: name.to_string(),
                    leaf_type: parse_leaf_type(kind)?,
                },
                _ => bail!("touch takes a name and an optional type"),
            },
            "tree" => Command::Tree,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("unknown command {other}, try help"),
        };
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Result<Args> {
        Args::parse(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["--config", "nav.json", "a", "b"]).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("nav.json")));
        assert_eq!(parsed.dirs, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(!parsed.demo);

        assert!(args(&["--demo"]).unwrap().demo);
        assert_eq!(args(&[]).unwrap(), Args::default());
    }

    #[test]
    fn test_bad_args() {
        assert!(args(&["--config"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["--demo", "dir"]).is_err());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("ls".parse::<Command>().unwrap(), Command::Ls);
        assert_eq!(
            "cd ..".parse::<Command>().unwrap(),
            Command::Cd("..".to_string())
        );
        assert_eq!(
            "resolve Report --fresh".parse::<Command>().unwrap(),
            Command::Resolve {
                query: "Report".to_string(),
                fresh: true,
                meta: false,
            }
        );
        assert_eq!(
            "touch sheet table".parse::<Command>().unwrap(),
            Command::Touch {
                name: "sheet".to_string(),
                leaf_type: LeafType::Table,
            }
        );
        assert_eq!("  quit  ".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_reject_malformed_commands() {
        assert!("".parse::<Command>().is_err());
        assert!("cd".parse::<Command>().is_err());
        assert!("cd a b".parse::<Command>().is_err());
        assert!("resolve --meta".parse::<Command>().is_err());
        assert!("touch x folder".parse::<Command>().is_err());
        assert!("launch".parse::<Command>().is_err());
    }
}
