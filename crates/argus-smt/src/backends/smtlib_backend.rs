use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;
use tracing::debug;

use crate::backends::sexp::{paren_balance, parse_sexp, parse_value};
use crate::backends::smtlib_printer::{sort_to_smtlib, symbol, to_smtlib};
use crate::solver::{Model, SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum SmtlibError {
    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("solver executable not found: {0}")]
    NotFound(String),
    #[error("solver error: {0}")]
    SolverError(String),
    #[error("Failed to parse solver output: {0}")]
    ParseError(String),
}

/// Any incremental SMT-LIB2 solver driven over a stdin/stdout pipe.
///
/// Every command is answered (`:print-success` is on), so a rejected
/// declaration or assertion surfaces as an error on the command that caused it.
pub struct SmtlibSolver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    vars: HashMap<String, SmtSort>,
}

impl SmtlibSolver {
    /// cvc5 in incremental mode.
    pub fn cvc5() -> Result<Self, SmtlibError> {
        Self::cvc5_with_timeout_secs(0)
    }

    pub fn cvc5_with_timeout_secs(timeout_secs: u64) -> Result<Self, SmtlibError> {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
        ];
        if timeout_secs > 0 {
            args.push(format!("--tlimit-per={}", timeout_secs.saturating_mul(1000)));
        }
        Self::with_command("cvc5", &args)
    }

    /// z3 reading SMT-LIB2 from stdin.
    pub fn z3() -> Result<Self, SmtlibError> {
        Self::z3_with_timeout_secs(0)
    }

    pub fn z3_with_timeout_secs(timeout_secs: u64) -> Result<Self, SmtlibError> {
        let mut args = vec!["-in".to_string(), "-smt2".to_string()];
        if timeout_secs > 0 {
            args.push(format!("-t:{}", timeout_secs.saturating_mul(1000)));
        }
        Self::with_command("z3", &args)
    }

    pub fn with_command(cmd: &str, args: &[String]) -> Result<Self, SmtlibError> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SmtlibError::NotFound(format!("{cmd}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SmtlibError::SolverError("failed to capture solver stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SmtlibError::SolverError("failed to capture solver stdout".into()))?;

        let mut solver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            vars: HashMap::new(),
        };
        solver.prelude()?;
        Ok(solver)
    }

    fn prelude(&mut self) -> Result<(), SmtlibError> {
        // The first option is sent before print-success takes effect.
        writeln!(self.stdin, "(set-option :print-success true)")?;
        self.stdin.flush()?;
        let ack = self.read_response()?;
        if ack != "success" {
            return Err(SmtlibError::SolverError(ack));
        }
        self.send_command("(set-option :produce-models true)")?;
        self.send_command("(set-logic ALL)")?;
        Ok(())
    }

    /// Reads one complete response, which may span several lines.
    fn read_response(&mut self) -> Result<String, SmtlibError> {
        let mut response = String::new();
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(SmtlibError::SolverError(format!(
                    "solver closed its output; partial response: {}",
                    response.trim()
                )));
            }
            response.push_str(&line);
            if !response.trim().is_empty() && paren_balance(&response) <= 0 {
                break;
            }
        }
        let response = response.trim().to_string();
        if response.starts_with("(error") {
            return Err(SmtlibError::SolverError(response));
        }
        Ok(response)
    }

    fn query(&mut self, cmd: &str) -> Result<String, SmtlibError> {
        debug!(target: "argus_smt::smtlib", "{cmd}");
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        self.read_response()
    }

    fn send_command(&mut self, cmd: &str) -> Result<(), SmtlibError> {
        let response = self.query(cmd)?;
        if response == "success" {
            Ok(())
        } else {
            Err(SmtlibError::SolverError(format!(
                "unexpected response to `{cmd}`: {response}"
            )))
        }
    }
}

impl Drop for SmtlibSolver {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl SmtSolver for SmtlibSolver {
    type Error = SmtlibError;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), SmtlibError> {
        let sort_str = sort_to_smtlib(sort);
        self.send_command(&format!("(declare-const {} {sort_str})", symbol(name)))?;
        self.vars.insert(name.to_string(), sort.clone());
        Ok(())
    }

    fn declare_fun(&mut self, name: &str, params: &[SmtSort], ret: &SmtSort) -> Result<(), SmtlibError> {
        let params: Vec<String> = params.iter().map(sort_to_smtlib).collect();
        self.send_command(&format!(
            "(declare-fun {} ({}) {})",
            symbol(name),
            params.join(" "),
            sort_to_smtlib(ret)
        ))
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), SmtlibError> {
        let smt_str = to_smtlib(term);
        self.send_command(&format!("(assert {smt_str})"))
    }

    fn push(&mut self) -> Result<(), SmtlibError> {
        self.send_command("(push 1)")
    }

    fn pop(&mut self) -> Result<(), SmtlibError> {
        self.send_command("(pop 1)")
    }

    fn check_sat(&mut self) -> Result<SatResult, SmtlibError> {
        let response = self.query("(check-sat)")?;
        match response.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => {
                let reason = self
                    .query("(get-info :reason-unknown)")
                    .unwrap_or_else(|_| "solver returned unknown".into());
                Ok(SatResult::Unknown(reason))
            }
            other => Err(SmtlibError::SolverError(other.to_string())),
        }
    }

    fn check_sat_with_model(
        &mut self,
        var_names: &[(&str, &SmtSort)],
    ) -> Result<(SatResult, Option<Model>), SmtlibError> {
        let result = self.check_sat()?;
        if result != SatResult::Sat {
            return Ok((result, None));
        }
        let mut values = HashMap::new();
        if var_names.is_empty() {
            return Ok((SatResult::Sat, Some(Model { values })));
        }

        let names: Vec<String> = var_names.iter().map(|(n, _)| symbol(n)).collect();
        let response = self.query(&format!("(get-value ({}))", names.join(" ")))?;
        // Response format: ((name value) (name value) ...)
        let parsed = parse_sexp(&response).map_err(SmtlibError::ParseError)?;
        let pairs = parsed
            .as_list()
            .ok_or_else(|| SmtlibError::ParseError(response.clone()))?;
        if pairs.len() != var_names.len() {
            return Err(SmtlibError::ParseError(format!(
                "expected {} values, got: {response}",
                var_names.len()
            )));
        }
        for (pair, &(name, sort)) in pairs.iter().zip(var_names) {
            let value = match pair.as_list() {
                Some([_, value]) => value,
                _ => return Err(SmtlibError::ParseError(format!("malformed binding: {pair:?}"))),
            };
            if let Some(val) = parse_value(value, sort) {
                values.insert(name.to_string(), val);
            }
        }
        Ok((SatResult::Sat, Some(Model { values })))
    }

    fn reset(&mut self) -> Result<(), SmtlibError> {
        self.send_command("(reset)")?;
        self.vars.clear();
        // `(reset)` restores the default options, print-success included.
        self.prelude()
    }
}

impl SmtlibSolver {
    /// Declared constants and their sorts.
    pub fn declared(&self) -> impl Iterator<Item = (&str, &SmtSort)> {
        self.vars.iter().map(|(n, s)| (n.as_str(), s))
    }
}

