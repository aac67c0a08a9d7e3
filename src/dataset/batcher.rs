//! Fixed-size batch accumulation over a lazy row stream

use crate::error::Result;

/// Groups transformed rows into bounded batches.
///
/// Each full batch is handed to the consumer as soon as it fills; a final
/// partial batch is flushed exactly once when the stream ends. Row order
/// is preserved across batch boundaries and no row is dropped.
#[derive(Debug, Clone, Copy)]
pub struct BatchAccumulator {
    batch_size: usize,
}

impl BatchAccumulator {
    /// Create an accumulator producing batches of at most `batch_size` rows
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Drain `rows`, classifying each through `transform` and delivering
    /// batches to `handler`. Returns the total number of rows delivered.
    ///
    /// A row or handler error aborts the run; rows already handed over
    /// stay handed over.
    pub fn run<T, I, F, H>(&self, rows: I, mut transform: F, mut handler: H) -> Result<usize>
    where
        I: Iterator<Item = Result<Vec<String>>>,
        F: FnMut(Vec<String>) -> Result<T>,
        H: FnMut(Vec<T>) -> Result<()>,
    {
        let mut batch: Vec<T> = Vec::with_capacity(self.batch_size);
        let mut total = 0usize;

        for row in rows {
            batch.push(transform(row?)?);
            total += 1;

            if batch.len() == self.batch_size {
                handler(std::mem::replace(
                    &mut batch,
                    Vec::with_capacity(self.batch_size),
                ))?;
            }
        }

        if !batch.is_empty() {
            handler(batch)?;
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> impl Iterator<Item = Result<Vec<String>>> {
        (0..n).map(|i| Ok(vec![i.to_string()]))
    }

    #[test]
    fn test_full_and_trailing_batches() {
        let acc = BatchAccumulator::new(3);
        let mut sizes = Vec::new();

        let total = acc
            .run(rows(7), |r| Ok(r[0].clone()), |batch| {
                sizes.push(batch.len());
                Ok(())
            })
            .unwrap();

        assert_eq!(total, 7);
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_flush() {
        let acc = BatchAccumulator::new(3);
        let mut batches = 0;

        acc.run(rows(6), |r| Ok(r), |_| {
            batches += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(batches, 2);
    }

    #[test]
    fn test_order_preserved_across_batches() {
        let acc = BatchAccumulator::new(4);
        let mut seen = Vec::new();

        acc.run(
            rows(10),
            |r| r[0].parse::<usize>().map_err(|e| crate::error::BatchmlError::Dataset(e.to_string())),
            |batch| {
                seen.extend(batch);
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_empty_stream_delivers_nothing() {
        let acc = BatchAccumulator::new(3);
        let mut batches = 0;

        let total = acc
            .run(rows(0), |r| Ok(r), |_| {
                batches += 1;
                Ok(())
            })
            .unwrap();

        assert_eq!(total, 0);
        assert_eq!(batches, 0);
    }
}
