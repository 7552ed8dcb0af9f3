use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use truku_compare::feedback::{contribution_count, JsonlFeedbackSink};
use truku_compare::lang::Direction;
use truku_compare::pipeline::{export_history, init_default_config, DualEngine, PipelineConfig, QueryOutcome};
use truku_compare::session::{Rating, Session, Slot, Submission, TranslationRecord};

#[derive(Parser, Debug)]
#[command(name = "truku-compare")]
#[command(about = "Side-by-side Truku / Mandarin translation (MT service + corpus-guided LLM)", long_about = None)]
struct Args {
    /// Generate default config + prompt files, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config/prompt files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing config/prompt files when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: search for truku-compare.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bilingual corpus (.xlsx/.csv/.tsv/.txt), overrides [corpus].path
    #[arg(long, value_name = "FILE")]
    corpus: Option<PathBuf>,

    /// zh-truku or truku-zh
    #[arg(long, short, default_value = "zh-truku")]
    direction: Direction,

    /// Write the session history to History_<timestamp>.json before exiting
    #[arg(long)]
    export_history: bool,

    /// Text to translate; without it an interactive prompt starts
    #[arg(value_name = "TEXT")]
    text: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if args.init_config {
        let dir = args.init_config_dir.clone().unwrap_or_else(|| cwd.clone());
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let cfg = PipelineConfig::from_args(&cwd, args.config.clone(), args.corpus.clone())
        .context("build config")?;
    let mut engine = DualEngine::from_config(&cfg).context("build engines")?;
    let mut sink = JsonlFeedbackSink::new(cfg.feedback_path.clone());
    let mut session = Session::new();

    if args.text.is_empty() {
        let mut repl = Repl {
            engine: &mut engine,
            session: &mut session,
            sink: &mut sink,
            direction: args.direction,
            export_dir: cfg.export_dir.clone(),
        };
        repl.run()?;
    } else {
        let mut out = io::stdout().lock();
        for text in &args.text {
            let outcome = engine.translate(&mut session, args.direction, text);
            if let Some(index) = outcome.index() {
                print_record(&mut out, index, &session.history()[index])?;
            }
        }
    }

    if args.export_history && !session.history().is_empty() {
        let path = export_history(&session, &cfg.export_dir)?;
        eprintln!("Wrote history: {}", path.display());
    }
    Ok(())
}

struct Repl<'a> {
    engine: &'a mut DualEngine,
    session: &'a mut Session,
    sink: &'a mut JsonlFeedbackSink,
    direction: Direction,
    export_dir: PathBuf,
}

impl Repl<'_> {
    fn run(&mut self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let mut out = io::stdout();
        writeln!(out, "{}  (:help for commands)", self.direction)?;
        write!(out, "> ")?;
        out.flush()?;

        for line in stdin.lock().lines() {
            let line = line.context("read stdin")?;
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(cmd) => {
                    if let Err(err) = self.apply(cmd, &mut out) {
                        writeln!(out, "! {err:#}")?;
                    }
                }
                Err(msg) => writeln!(out, "! {msg}")?,
            }
            write!(out, "> ")?;
            out.flush()?;
        }
        Ok(())
    }

    fn apply(&mut self, cmd: Command, out: &mut impl Write) -> anyhow::Result<()> {
        match cmd {
            Command::Translate(text) => {
                let outcome = self.engine.translate(self.session, self.direction, &text);
                if let QueryOutcome::Reused { .. } = outcome {
                    writeln!(out, "(cached)")?;
                }
                if let Some(index) = outcome.index() {
                    print_record(out, index, &self.session.history()[index])?;
                }
            }
            Command::Direction(d) => {
                self.direction = d.unwrap_or(self.direction.reversed());
                writeln!(out, "{}", self.direction)?;
            }
            Command::Rate(slot, rating) => {
                let index = self.current()?;
                self.session.rate(index, slot, rating)?;
                writeln!(out, "已記錄評價：{slot} {}", rating.label())?;
                if self.session.accepts_correction(index, slot) {
                    let n = slot_number(slot);
                    writeln!(out, "歡迎提供建議翻譯：:fix {n} <建議翻譯>")?;
                }
            }
            Command::Fix(slot, text) => {
                let index = self.current()?;
                match self.session.submit_correction(index, slot, &text, self.sink)? {
                    Submission::Recorded => writeln!(out, "感謝您的建議，已成功存檔！")?,
                    Submission::AlreadySubmitted => writeln!(out, "此筆建議已提交")?,
                }
            }
            Command::Show(None) => {
                let index = self.current()?;
                print_record(out, index, &self.session.history()[index])?;
            }
            Command::Show(Some(index)) => {
                self.session.select(index)?;
                print_record(out, index, &self.session.history()[index])?;
            }
            Command::History => {
                for (i, r) in self.session.history().iter().enumerate() {
                    let mark = if Some(i) == self.session.current_index() { '*' } else { ' ' };
                    writeln!(out, "{mark}{i:>3}  {}  {}  {}", r.timestamp.format("%H:%M:%S"), r.direction, r.original)?;
                }
            }
            Command::Count => {
                writeln!(out, "全社群累計建議數：{}", contribution_count(&*self.sink))?;
            }
            Command::Export => {
                if self.session.history().is_empty() {
                    writeln!(out, "尚無翻譯記錄")?;
                } else {
                    let path = export_history(self.session, &self.export_dir)?;
                    writeln!(out, "已匯出：{}", path.display())?;
                }
            }
            Command::Clear => {
                self.session.reset();
                writeln!(out, "已清除所有記錄")?;
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Noop | Command::Quit => {}
        }
        Ok(())
    }

    fn current(&self) -> anyhow::Result<usize> {
        self.session
            .current_index()
            .context("no active record; translate something first")
    }
}

const HELP: &str = "\
<text>                     translate in the current direction
:dir [zh-truku|truku-zh]   switch direction (toggles without argument)
:rate <1|2> <優質|普通|不佳>  rate reference one (MT) or two (corpus/LLM)
:fix <1|2> <text>          submit a better translation for a 普通/不佳 result
:show [n]                  show the active record, or activate record n
:history                   list this session's records
:count                     community contribution count
:export                    write History_<timestamp>.json
:clear                     clear history and cache
:quit";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Translate(String),
    Direction(Option<Direction>),
    Rate(Slot, Rating),
    Fix(Slot, String),
    Show(Option<usize>),
    History,
    Count,
    Export,
    Clear,
    Help,
    Noop,
    Quit,
}

impl Command {
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(':') else {
            return Ok(if line.is_empty() {
                Self::Noop
            } else {
                Self::Translate(line.to_string())
            });
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((n, a)) => (n, a.trim()),
            None => (rest, ""),
        };
        match name {
            "dir" | "d" => {
                if arg.is_empty() {
                    Ok(Self::Direction(None))
                } else {
                    arg.parse().map(|d| Self::Direction(Some(d))).map_err(|e| format!("{e}"))
                }
            }
            "rate" | "r" => {
                let (slot, rating) = split_slot(arg)?;
                let rating = Rating::parse(rating).ok_or_else(|| format!("unknown rating: {rating}"))?;
                Ok(Self::Rate(slot, rating))
            }
            "fix" | "f" => {
                let (slot, text) = split_slot(arg)?;
                Ok(Self::Fix(slot, text.to_string()))
            }
            "show" | "s" => {
                if arg.is_empty() {
                    Ok(Self::Show(None))
                } else {
                    arg.parse().map(|n| Self::Show(Some(n))).map_err(|_| format!("not an index: {arg}"))
                }
            }
            "history" | "h" => Ok(Self::History),
            "count" => Ok(Self::Count),
            "export" => Ok(Self::Export),
            "clear" => Ok(Self::Clear),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command :{other} (:help)")),
        }
    }
}

fn split_slot(arg: &str) -> Result<(Slot, &str), String> {
    let (n, rest) = arg.split_once(char::is_whitespace).unwrap_or((arg, ""));
    let slot = match n {
        "1" => Slot::Mt,
        "2" => Slot::Generative,
        _ => return Err(format!("expected slot 1 or 2, got {n:?}")),
    };
    Ok((slot, rest.trim()))
}

fn slot_number(slot: Slot) -> u8 {
    match slot {
        Slot::Mt => 1,
        Slot::Generative => 2,
    }
}

fn print_record(out: &mut impl Write, index: usize, r: &TranslationRecord) -> io::Result<()> {
    writeln!(out, "[{index}] {}  {}", r.direction, r.original)?;
    for slot in [Slot::Mt, Slot::Generative] {
        let s = r.slot(slot);
        let source = match slot {
            Slot::Mt => "MT",
            Slot::Generative => r.generative_source.label(),
        };
        let mut line = format!("  {} {slot} ({source}): {}", slot_number(slot), s.text);
        if !s.rating.label().is_empty() {
            line.push_str(&format!("  [{}]", s.rating.label()));
        }
        if s.submitted {
            line.push_str("  [已建議]");
        }
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Command;
    use truku_compare::lang::Direction;
    use truku_compare::session::{Rating, Slot};

    #[test]
    fn plain_lines_translate() {
        assert_eq!(Command::parse("  你好 "), Ok(Command::Translate("你好".to_string())));
        assert_eq!(Command::parse(""), Ok(Command::Noop));
    }

    #[test]
    fn commands_parse_arguments() {
        assert_eq!(Command::parse(":dir"), Ok(Command::Direction(None)));
        assert_eq!(Command::parse(":dir truku-zh"), Ok(Command::Direction(Some(Direction::TrukuToZh))));
        assert_eq!(Command::parse(":rate 2 不佳"), Ok(Command::Rate(Slot::Generative, Rating::Poor)));
        assert_eq!(
            Command::parse(":fix 1 Kia su hug"),
            Ok(Command::Fix(Slot::Mt, "Kia su hug".to_string()))
        );
        assert_eq!(Command::parse(":show 3"), Ok(Command::Show(Some(3))));
        assert_eq!(Command::parse(":q"), Ok(Command::Quit));
    }

    #[test]
    fn bad_commands_are_reported() {
        assert!(Command::parse(":rate 3 good").is_err());
        assert!(Command::parse(":rate 1 meh").is_err());
        assert!(Command::parse(":nope").is_err());
    }
}
