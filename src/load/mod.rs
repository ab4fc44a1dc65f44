/*! Reading task sets from CSV files

Each record describes one task:

```text
# name, period, deadline, wcet(1), wcet(2), ..., wcet(m)
t:1, 100, 90, 25, 30
t:2, 200, 200, 40
```

The number of WCET columns determines the task's thread count. Blank
lines and lines starting with `#` are ignored.
*/

use std::io;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use crate::task::Task;
use crate::taskset::TaskSet;
use crate::time::Time;

/// Error type for task-set loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("line {line}: missing {field}")]
    MissingField { line: u64, field: &'static str },
    #[error("line {line}: invalid {field} {value:?}")]
    InvalidNumber {
        line: u64,
        field: &'static str,
        value: String,
    },
}

/// Read a task set from the CSV file at `path`.
pub fn read_task_set(path: impl AsRef<Path>) -> Result<TaskSet, LoadError> {
    let rdr = builder().from_path(path)?;
    collect(rdr)
}

/// Read a task set from any CSV source.
pub fn parse_task_set<R: io::Read>(reader: R) -> Result<TaskSet, LoadError> {
    collect(builder().from_reader(reader))
}

fn builder() -> ReaderBuilder {
    let mut b = ReaderBuilder::new();
    b.has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All);
    b
}

fn collect<R: io::Read>(mut rdr: csv::Reader<R>) -> Result<TaskSet, LoadError> {
    let mut ts = TaskSet::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        ts.insert(parse_record(&record)?);
    }
    Ok(ts)
}

fn parse_record(record: &StringRecord) -> Result<Task, LoadError> {
    let line = record.position().map_or(0, |p| p.line());
    let field = |idx: usize, what: &'static str| -> Result<&str, LoadError> {
        record
            .get(idx)
            .filter(|s| !s.is_empty())
            .ok_or(LoadError::MissingField { line, field: what })
    };
    let number = |value: &str, what: &'static str| -> Result<Time, LoadError> {
        value.parse().map_err(|_| LoadError::InvalidNumber {
            line,
            field: what,
            value: value.to_string(),
        })
    };

    let name = field(0, "name")?;
    let period = number(field(1, "period")?, "period")?;
    let deadline = number(field(2, "deadline")?, "deadline")?;
    field(3, "wcet")?;
    let wcets = record
        .iter()
        .skip(3)
        .map(|v| number(v, "wcet"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Task::with_wcets(name, period, deadline, wcets))
}
