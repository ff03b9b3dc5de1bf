//! Line commands typed at the tasksync prompt.

use tasksync_core::PrepareOptions;

pub const HELP: &str = "\
commands:
  prepare <url> [format] [quality]   fetch playlist info for a source URL
  select <i> [i ...]                 choose tracks on the preview (0-based)
  start                              start the prepared task with the selection
  back                               leave the preview
  cancel <task_id>                   ask the server to cancel a task
  delete <task_id>                   remove a task
  link <task_id>                     fetch a signed download URL
  queue <i> [i ...]                  download selected tracks one at a time
  save <n>                           save queue item n once it is ready
  hide | show                        simulate the page leaving or regaining focus
  tasks                              print the current task list
  history                            print recently finished tasks
  help                               show this text
  quit                               exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Prepare { url: String, options: PrepareOptions },
    Select(Vec<usize>),
    Start,
    Back,
    Cancel(String),
    Delete(String),
    Link(String),
    Queue(Vec<usize>),
    Save(usize),
    Hide,
    Show,
    Tasks,
    History,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err("empty command".to_string());
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "prepare" | "p" => {
            let (url, rest) = args
                .split_first()
                .ok_or_else(|| "usage: prepare <url> [format] [quality]".to_string())?;
            if rest.len() > 2 {
                return Err("usage: prepare <url> [format] [quality]".to_string());
            }
            Command::Prepare {
                url: (*url).to_string(),
                options: PrepareOptions {
                    format: rest.first().map(|s| (*s).to_string()),
                    quality: rest.get(1).map(|s| (*s).to_string()),
                    filename: None,
                },
            }
        }
        "select" => Command::Select(indices(&args)?),
        "start" => no_args(&args, Command::Start)?,
        "back" => no_args(&args, Command::Back)?,
        "cancel" => Command::Cancel(single(&args, "cancel <task_id>")?),
        "delete" | "rm" => Command::Delete(single(&args, "delete <task_id>")?),
        "link" => Command::Link(single(&args, "link <task_id>")?),
        "queue" => {
            let picked = indices(&args)?;
            if picked.is_empty() {
                return Err("usage: queue <i> [i ...]".to_string());
            }
            Command::Queue(picked)
        }
        "save" => {
            let raw = single(&args, "save <n>")?;
            Command::Save(index(&raw)?)
        }
        "hide" => no_args(&args, Command::Hide)?,
        "show" => no_args(&args, Command::Show)?,
        "tasks" | "ls" => no_args(&args, Command::Tasks)?,
        "history" => no_args(&args, Command::History)?,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command `{other}`; try `help`")),
    };
    Ok(command)
}

fn no_args(args: &[&str], command: Command) -> Result<Command, String> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(format!("`{}` takes no arguments", verb_of(&command)))
    }
}

fn single(args: &[&str], usage: &str) -> Result<String, String> {
    match args {
        [one] => Ok((*one).to_string()),
        _ => Err(format!("usage: {usage}")),
    }
}

fn indices(args: &[&str]) -> Result<Vec<usize>, String> {
    args.iter().map(|raw| index(raw)).collect()
}

fn index(raw: &str) -> Result<usize, String> {
    raw.parse()
        .map_err(|_| format!("`{raw}` is not a track index"))
}

fn verb_of(command: &Command) -> &'static str {
    match command {
        Command::Start => "start",
        Command::Back => "back",
        Command::Hide => "hide",
        Command::Show => "show",
        Command::Tasks => "tasks",
        Command::History => "history",
        _ => "command",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prepare_takes_optional_format_and_quality() {
        assert_eq!(
            parse("prepare https://example.com/p/1 mp3 320").unwrap(),
            Command::Prepare {
                url: "https://example.com/p/1".to_string(),
                options: PrepareOptions {
                    format: Some("mp3".to_string()),
                    quality: Some("320".to_string()),
                    filename: None,
                },
            }
        );
        assert_eq!(
            parse("p https://example.com/p/1").unwrap(),
            Command::Prepare {
                url: "https://example.com/p/1".to_string(),
                options: PrepareOptions::default(),
            }
        );
        assert!(parse("prepare").is_err());
        assert!(parse("prepare u a b c").is_err());
    }

    #[test]
    fn index_lists_are_zero_based_numbers() {
        assert_eq!(parse("select 0 2 5").unwrap(), Command::Select(vec![0, 2, 5]));
        assert_eq!(parse("select").unwrap(), Command::Select(Vec::new()));
        assert_eq!(parse("queue 1 3").unwrap(), Command::Queue(vec![1, 3]));
        assert!(parse("queue").is_err());
        assert!(parse("select one").is_err());
        assert!(parse("select -1").is_err());
    }

    #[test]
    fn task_commands_need_exactly_one_id() {
        assert_eq!(parse("cancel abc").unwrap(), Command::Cancel("abc".to_string()));
        assert_eq!(parse("rm abc").unwrap(), Command::Delete("abc".to_string()));
        assert_eq!(parse("link abc").unwrap(), Command::Link("abc".to_string()));
        assert!(parse("cancel").is_err());
        assert!(parse("delete a b").is_err());
    }

    #[test]
    fn bare_commands_reject_arguments() {
        assert_eq!(parse("  START ").unwrap(), Command::Start);
        assert_eq!(parse("hide").unwrap(), Command::Hide);
        assert_eq!(parse("save 2").unwrap(), Command::Save(2));
        let err = parse("start now").unwrap_err();
        assert_eq!(err, "`start` takes no arguments");
    }

    #[test]
    fn unknown_and_empty_lines_are_errors() {
        assert!(parse("").is_err());
        assert!(parse("   ").is_err());
        assert_eq!(
            parse("frobnicate").unwrap_err(),
            "unknown command `frobnicate`; try `help`"
        );
    }
}
