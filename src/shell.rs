//! Line-oriented command dispatcher over a [`VirtualDirectory`].
//!
//! Each input line is one command. A failing command prints `ERROR: <message>` to the error
//! stream and the loop goes on with the next line; `exit` stops it.

use std::io::{BufRead, Write};

use anyhow::{Context, bail};

use crate::VirtualDirectory;

/// What the loop should do after a command.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell {
    vd: VirtualDirectory,
}

fn arg<'a>(args: &[&'a str], index: usize, usage: &str) -> anyhow::Result<&'a str> {
    match args.get(index) {
        Some(value) => Ok(*value),
        None => bail!("usage: {}", usage),
    }
}

fn position(value: &str) -> anyhow::Result<u64> {
    value
        .parse()
        .with_context(|| format!("invalid position '{}'", value))
}

impl Shell {
    pub fn new(vd: VirtualDirectory) -> Self {
        Self { vd }
    }

    pub fn vd(&self) -> &VirtualDirectory {
        &self.vd
    }

    /// Runs one command line, writing its output to `out`.
    pub fn execute<W: Write>(&mut self, line: &str, out: &mut W) -> anyhow::Result<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = words.collect();

        match command {
            "exit" => return Ok(Flow::Exit),
            "pwd" => writeln!(out, "{}", self.vd.pwd())?,
            "touch" => self.vd.touch(arg(&args, 0, "touch <path>")?)?,
            "write" => {
                const USAGE: &str = "write <path> <pos> <char>";
                // the character is taken verbatim so that a space can be written
                let fields: Vec<&str> = line.trim_start().splitn(4, ' ').collect();
                let path = arg(&fields, 1, USAGE)?;
                let pos = position(arg(&fields, 2, USAGE)?)?;
                let byte = match arg(&fields, 3, USAGE)?.as_bytes() {
                    [byte] => *byte,
                    _ => bail!("write expects a single character"),
                };
                self.vd.write(path, pos, byte)?;
            }
            "read" => {
                const USAGE: &str = "read <path> <pos>";
                let path = arg(&args, 0, USAGE)?;
                let pos = position(arg(&args, 1, USAGE)?)?;
                writeln!(out, "{}", self.vd.read(path, pos)? as char)?;
            }
            "cat" => {
                let path = arg(&args, 0, "cat <path>")?;
                let lines = self.vd.cat(path)?;
                writeln!(
                    out,
                    "{} (refs: {})",
                    self.vd.physical_name(path)?,
                    self.vd.reference_count(path)?
                )?;
                for line in lines {
                    writeln!(out, "{}", line)?;
                }
            }
            "wc" => writeln!(out, "{}", self.vd.wc(arg(&args, 0, "wc <path>")?)?)?,
            "mkdir" => self.vd.mkdir(arg(&args, 0, "mkdir <path>")?)?,
            "chdir" | "cd" => self.vd.chdir(arg(&args, 0, "chdir <path>")?)?,
            "rmdir" => self.vd.rmdir(arg(&args, 0, "rmdir <path>")?)?,
            "ls" => {
                for entry in self.vd.ls(args.first().copied())? {
                    writeln!(out, "{}", entry)?;
                }
            }
            "tree" => {
                for entry in self.vd.tree() {
                    writeln!(out, "{}", entry)?;
                }
            }
            "copy" => {
                const USAGE: &str = "copy <src> <dst>";
                self.vd.copy(arg(&args, 0, USAGE)?, arg(&args, 1, USAGE)?)?;
            }
            "remove" => self.vd.remove(arg(&args, 0, "remove <path>")?)?,
            "move" => {
                const USAGE: &str = "move <src> <dst>";
                self.vd.mv(arg(&args, 0, USAGE)?, arg(&args, 1, USAGE)?)?;
            }
            "ln" => {
                const USAGE: &str = "ln <src> <dst>";
                self.vd.ln(arg(&args, 0, USAGE)?, arg(&args, 1, USAGE)?)?;
            }
            _ => bail!("unknown command"),
        }
        Ok(Flow::Continue)
    }

    /// Reads commands from `input` until `exit` or end of input.
    pub fn run<R, W, E>(&mut self, input: R, out: &mut W, err: &mut E) -> anyhow::Result<()>
    where
        R: BufRead,
        W: Write,
        E: Write,
    {
        for line in input.lines() {
            let line = line.context("failed to read command")?;
            match self.execute(&line, out) {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => writeln!(err, "ERROR: {}", e)?,
            }
            out.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn setup_test_env() -> (TempDir, Shell) {
        let temp_dir = TempDir::new("shell_test").unwrap();
        let vd = VirtualDirectory::new(temp_dir.path()).unwrap();
        (temp_dir, Shell::new(vd))
    }

    fn run_script(shell: &mut Shell, script: &str) -> (String, String) {
        let mut out = Vec::new();
        let mut err = Vec::new();
        shell.run(script.as_bytes(), &mut out, &mut err).unwrap();
        (
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_write_read_cat_wc() {
        let (_tmp, mut shell) = setup_test_env();
        let (out, err) = run_script(
            &mut shell,
            "touch f.txt\nwrite f.txt 0 A\nwrite f.txt 1 B\nwrite f.txt 2 C\n\
             write f.txt 1 _\nread f.txt 1\ncat f.txt\nwc f.txt\n",
        );
        assert_eq!(err, "");
        assert_eq!(out, "_\nf.txt (refs: 1)\nA_C\n0 1 3\n");
    }

    #[test]
    fn test_navigation_and_listing() {
        let (_tmp, mut shell) = setup_test_env();
        let (out, err) = run_script(
            &mut shell,
            "mkdir docs\nchdir docs\ntouch a.txt\nln a.txt /b.txt\npwd\nls /\nchdir ..\npwd\ntree\n",
        );
        assert_eq!(err, "");
        assert_eq!(
            out,
            "/docs\ndocs/\nb.txt (refs: 2)\n/\n/\n/b.txt (refs: 2)\n/docs/\n/docs/a.txt (refs: 2)\n"
        );
    }

    #[test]
    fn test_write_space_character() {
        let (_tmp, mut shell) = setup_test_env();
        let (out, err) = run_script(
            &mut shell,
            "touch f.txt\nwrite f.txt 0 A\nwrite f.txt 1 B\nwrite f.txt 2 C\n\
             write f.txt 1  \ncat f.txt\nwc f.txt\n",
        );
        assert_eq!(err, "");
        assert_eq!(out, "f.txt (refs: 1)\nA C\n0 2 3\n");
    }

    #[test]
    fn test_errors_do_not_stop_the_loop() {
        let (_tmp, mut shell) = setup_test_env();
        let (out, err) = run_script(
            &mut shell,
            "frobnicate\nmkdir a\nmkdir a\nread missing.txt 0\nwrite\ntouch f\nwrite f x y\npwd\n",
        );
        assert_eq!(out, "/\n");
        let lines: Vec<_> = err.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "ERROR: unknown command");
        assert_eq!(lines[1], "ERROR: /a: already exists");
        assert_eq!(lines[2], "ERROR: missing.txt: no such file or directory");
        assert_eq!(lines[3], "ERROR: usage: write <path> <pos> <char>");
        assert_eq!(lines[4], "ERROR: invalid position 'x'");
    }

    #[test]
    fn test_exit_stops_processing() {
        let (_tmp, mut shell) = setup_test_env();
        let (out, _) = run_script(&mut shell, "pwd\nexit\npwd\n");
        assert_eq!(out, "/\n");
    }

    #[test]
    fn test_copy_move_remove() {
        let (_tmp, mut shell) = setup_test_env();
        let (out, err) = run_script(
            &mut shell,
            "touch a\nwrite a 0 Q\ncopy a c\nmove c d\nremove a\nls\nread d 0\n",
        );
        assert_eq!(err, "");
        assert_eq!(out, "d (refs: 1)\nQ\n");
        assert!(!shell.vd().store().exists("a"));
        assert!(!shell.vd().store().exists("c"));
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let (_tmp, mut shell) = setup_test_env();
        let mut out = Vec::new();
        assert_eq!(shell.execute("   ", &mut out).unwrap(), Flow::Continue);
        assert!(out.is_empty());
    }
}
