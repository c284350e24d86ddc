use crate::error::ExecutorError;
use std::path::Path;

#[cfg(feature = "enn-backend")]
pub mod enn;

/// Buffer counts reported by the runtime after allocation.
#[derive(Debug, Clone, Copy)]
pub struct BufferCounts {
    pub inputs: usize,
    pub outputs: usize,
}

/// The opaque native inference runtime.
///
/// Implementations wrap a vendor NPU library. The driver is accessed by one
/// thread at a time; `NativeModel` guarantees the lifecycle order
/// open -> allocate -> (execute)* -> release -> close.
pub trait RuntimeDriver: Send {
    fn open(&mut self, model_path: &Path) -> Result<(), ExecutorError>;

    fn allocate_buffers(&mut self) -> Result<BufferCounts, ExecutorError>;

    fn write_input(&mut self, index: usize, data: &[u8]) -> Result<(), ExecutorError>;

    /// Synchronous, blocking model execution.
    fn execute(&mut self) -> Result<(), ExecutorError>;

    fn read_output(&mut self, index: usize) -> Result<Vec<u8>, ExecutorError>;

    fn release_buffers(&mut self);

    fn close(&mut self);
}

/// An opened model with allocated device buffers.
///
/// Acquires the native handle on `load` and releases buffers and handle on
/// every exit path via `Drop`, so teardown happens even when a frame fails
/// mid-flight.
pub struct NativeModel<D: RuntimeDriver> {
    driver: D,
    output_count: usize,
}

impl<D: RuntimeDriver> NativeModel<D> {
    pub fn load(mut driver: D, model_path: &Path) -> Result<Self, ExecutorError> {
        driver.open(model_path)?;

        let counts = match driver.allocate_buffers() {
            Ok(counts) => counts,
            Err(e) => {
                driver.close();
                return Err(e);
            }
        };

        tracing::info!(
            model_path = %model_path.display(),
            inputs = counts.inputs,
            outputs = counts.outputs,
            "Model loaded and buffers allocated"
        );

        Ok(Self {
            driver,
            output_count: counts.outputs,
        })
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Copy `input` into the first device buffer, execute the model, and
    /// read back every output buffer.
    pub fn run(&mut self, input: &[u8]) -> Result<Vec<Vec<u8>>, ExecutorError> {
        self.driver.write_input(0, input)?;
        self.driver.execute()?;

        (0..self.output_count)
            .map(|index| self.driver.read_output(index))
            .collect()
    }
}

impl<D: RuntimeDriver> Drop for NativeModel<D> {
    fn drop(&mut self) {
        self.driver.release_buffers();
        self.driver.close();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeDriver;
    use super::*;

    #[test]
    fn test_lifecycle_order_is_enforced() {
        let driver = FakeDriver::with_outputs(vec![vec![1, 2, 3]]);
        let calls = driver.calls.clone();

        {
            let mut model = NativeModel::load(driver, Path::new("/models/test.nnc")).unwrap();
            model.run(&[0u8; 4]).unwrap();
            model.run(&[0u8; 4]).unwrap();
        }

        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &[
                "open",
                "allocate",
                "write_input 0",
                "execute",
                "read_output 0",
                "write_input 0",
                "execute",
                "read_output 0",
                "release",
                "close",
            ],
            "Lifecycle must be open -> allocate -> (execute)* -> release -> close"
        );
    }

    #[test]
    fn test_open_failure_does_not_allocate() {
        let mut driver = FakeDriver::with_outputs(vec![]);
        driver.fail_open = true;
        let calls = driver.calls.clone();

        let result = NativeModel::load(driver, Path::new("/models/test.nnc"));
        assert!(result.is_err());
        assert_eq!(calls.lock().unwrap().as_slice(), &["open"]);
    }

    #[test]
    fn test_allocate_failure_still_closes_handle() {
        let mut driver = FakeDriver::with_outputs(vec![]);
        driver.fail_allocate = true;
        let calls = driver.calls.clone();

        let result = NativeModel::load(driver, Path::new("/models/test.nnc"));
        assert!(result.is_err());
        assert_eq!(
            calls.lock().unwrap().as_slice(),
            &["open", "allocate", "close"],
            "A failed allocation must still close the model handle"
        );
    }

    #[test]
    fn test_execute_failure_releases_on_drop() {
        let mut driver = FakeDriver::with_outputs(vec![vec![0]]);
        driver.fail_execute = true;
        let calls = driver.calls.clone();

        {
            let mut model = NativeModel::load(driver, Path::new("/models/test.nnc")).unwrap();
            let result = model.run(&[0u8]);
            assert!(result.is_err(), "Execute failure must propagate");
        }

        let calls = calls.lock().unwrap();
        assert_eq!(
            &calls[calls.len() - 2..],
            &["release", "close"],
            "Native resources must release after an execute failure"
        );
    }

    #[test]
    fn test_run_reads_all_outputs_in_order() {
        let driver = FakeDriver::with_outputs(vec![vec![1], vec![2, 2], vec![3, 3, 3]]);
        let mut model = NativeModel::load(driver, Path::new("/models/test.nnc")).unwrap();

        let outputs = model.run(&[9u8]).unwrap();
        assert_eq!(outputs, vec![vec![1], vec![2, 2], vec![3, 3, 3]]);
    }
}
