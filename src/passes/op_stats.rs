// print-op-stats: count the operations in the matched subtree by name.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::op::Operation;
use crate::pass::{OptionError, Pass, PassExecutionState, PassOption};
use crate::type_id::PassTypeId;

fn op_stats_type_id() -> PassTypeId {
    static ID: OnceLock<PassTypeId> = OnceLock::new();
    *ID.get_or_init(crate::type_id::allocate_type_id)
}

/// Prints a per-operation-name count of the subtree it runs on, either as
/// aligned text or as a JSON object (`json` option, default `false`).
///
/// Output goes to the shared buffer supplied at construction, or to the
/// process error stream when none is set. Registered under the argument
/// `print-op-stats`.
pub struct OpStatsPass {
    json: bool,
    output: Option<Arc<Mutex<String>>>,
}

impl OpStatsPass {
    pub fn new() -> Self {
        Self {
            json: false,
            output: None,
        }
    }

    /// Sends the report to a shared buffer instead of stderr.
    pub fn with_buffer(buffer: Arc<Mutex<String>>) -> Self {
        Self {
            json: false,
            output: Some(buffer),
        }
    }

    fn render(&self, counts: &BTreeMap<String, usize>) -> String {
        if self.json {
            let body: Vec<String> = counts
                .iter()
                .map(|(name, count)| format!("\"{name}\": {count}"))
                .collect();
            format!("{{{}}}\n", body.join(", "))
        } else {
            let mut report = String::from("Operations encountered:\n");
            report.push_str("-----------------------\n");
            for (name, count) in counts {
                report.push_str(&format!("  {name} , {count}\n"));
            }
            report
        }
    }
}

impl Default for OpStatsPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for OpStatsPass {
    fn type_id(&self) -> PassTypeId {
        op_stats_type_id()
    }

    fn name(&self) -> &str {
        "PrintOpStats"
    }

    fn argument(&self) -> &str {
        "print-op-stats"
    }

    fn description(&self) -> &str {
        "Print statistics of operations"
    }

    fn options(&self) -> Vec<PassOption> {
        vec![PassOption::new("json", if self.json { "true" } else { "false" })]
    }

    fn set_option(&mut self, key: &str, value: &str) -> Result<(), OptionError> {
        match key {
            "json" => match value {
                "true" => {
                    self.json = true;
                    Ok(())
                }
                "false" => {
                    self.json = false;
                    Ok(())
                }
                _ => Err(OptionError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                }),
            },
            _ => Err(OptionError::Unknown {
                key: key.to_string(),
            }),
        }
    }

    fn run(&mut self, op: &mut Operation, _state: &mut PassExecutionState) {
        let mut counts = BTreeMap::new();
        op.walk(&mut |nested| {
            *counts.entry(nested.name().to_string()).or_insert(0usize) += 1;
        });

        let report = self.render(&counts);
        match &self.output {
            Some(buffer) => {
                let mut buffer = buffer.lock().unwrap_or_else(|e| e.into_inner());
                buffer.push_str(&report);
            }
            None => eprint!("{report}"),
        }
    }

    fn clone_pass(&self) -> Box<dyn Pass> {
        Box::new(Self {
            json: self.json,
            output: self.output.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::Region;
    use indoc::indoc;

    fn sample_func() -> Operation {
        Operation::new("func.func").with_region(Region::single_block(vec![
            Operation::new("arith.addi"),
            Operation::new("func.return"),
        ]))
    }

    #[test]
    fn text_report_is_sorted_by_name() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut pass = OpStatsPass::with_buffer(Arc::clone(&buffer));
        let mut func = sample_func();
        let mut state = PassExecutionState::default();
        pass.run(&mut func, &mut state);

        assert!(!state.failed());
        let expected = indoc! {"
            Operations encountered:
            -----------------------
              arith.addi , 1
              func.func , 1
              func.return , 1
        "};
        assert_eq!(*buffer.lock().unwrap(), expected);
    }

    #[test]
    fn json_report_is_a_single_object() {
        let buffer = Arc::new(Mutex::new(String::new()));
        let mut pass = OpStatsPass::with_buffer(Arc::clone(&buffer));
        pass.set_option("json", "true").unwrap();

        let mut func = sample_func();
        let mut state = PassExecutionState::default();
        pass.run(&mut func, &mut state);

        assert_eq!(
            *buffer.lock().unwrap(),
            "{\"arith.addi\": 1, \"func.func\": 1, \"func.return\": 1}\n"
        );
    }

    #[test]
    fn invalid_option_values_are_rejected() {
        let mut pass = OpStatsPass::new();
        assert!(pass.set_option("json", "yes").is_err());
        assert!(pass.set_option("verbose", "true").is_err());
    }
}
