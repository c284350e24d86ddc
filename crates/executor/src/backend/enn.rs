//! Bindings to the vendor ENN runtime.
//!
//! The runtime is an opaque NPU execution library; these bindings cover the
//! lifecycle hooks and host/device copies only. Enabled via the
//! `enn-backend` feature so the rest of the workspace builds without the
//! proprietary blob.

use super::{BufferCounts, RuntimeDriver};
use crate::error::ExecutorError;
use std::ffi::CString;
use std::os::raw::c_char;
use std::path::Path;

#[repr(C)]
struct EnnBufferSetInfo {
    buffer_set: u64,
    n_in_buf: i32,
    n_out_buf: i32,
}

#[link(name = "enn_public_api")]
unsafe extern "C" {
    fn enn_initialize() -> i32;
    fn enn_deinitialize() -> i32;
    fn enn_open_model(path: *const c_char) -> u64;
    fn enn_close_model(model_id: u64) -> i32;
    fn enn_allocate_all_buffers(model_id: u64, info: *mut EnnBufferSetInfo) -> i32;
    fn enn_release_buffers(buffer_set: u64, buffer_count: i32) -> i32;
    fn enn_execute_model(model_id: u64) -> i32;
    fn enn_buffer_size(buffer_set: u64, layer: i32) -> usize;
    fn enn_memcpy_host_to_device(buffer_set: u64, layer: i32, data: *const u8, len: usize) -> i32;
    fn enn_memcpy_device_to_host(buffer_set: u64, layer: i32, data: *mut u8, len: usize) -> i32;
}

fn check(code: i32, operation: &str) -> Result<(), ExecutorError> {
    if code == 0 {
        Ok(())
    } else {
        Err(ExecutorError::Runtime(format!(
            "{operation} returned {code}"
        )))
    }
}

/// Driver over the ENN runtime. Output layers sit after the input layers in
/// the buffer set, so output `i` maps to layer `n_in_buf + i`.
pub struct EnnDriver {
    initialized: bool,
    model_id: u64,
    buffer_set: u64,
    n_in_buf: i32,
    n_out_buf: i32,
}

impl EnnDriver {
    pub fn new() -> Self {
        Self {
            initialized: false,
            model_id: 0,
            buffer_set: 0,
            n_in_buf: 0,
            n_out_buf: 0,
        }
    }
}

impl Default for EnnDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeDriver for EnnDriver {
    fn open(&mut self, model_path: &Path) -> Result<(), ExecutorError> {
        let path = CString::new(model_path.to_string_lossy().as_bytes())
            .map_err(|e| ExecutorError::Runtime(format!("invalid model path: {e}")))?;

        unsafe {
            check(enn_initialize(), "enn_initialize")?;
            self.initialized = true;

            self.model_id = enn_open_model(path.as_ptr());
        }

        if self.model_id == 0 {
            return Err(ExecutorError::Runtime(format!(
                "enn_open_model failed for {}",
                model_path.display()
            )));
        }

        Ok(())
    }

    fn allocate_buffers(&mut self) -> Result<BufferCounts, ExecutorError> {
        let mut info = EnnBufferSetInfo {
            buffer_set: 0,
            n_in_buf: 0,
            n_out_buf: 0,
        };

        unsafe {
            check(
                enn_allocate_all_buffers(self.model_id, &mut info),
                "enn_allocate_all_buffers",
            )?;
        }

        self.buffer_set = info.buffer_set;
        self.n_in_buf = info.n_in_buf;
        self.n_out_buf = info.n_out_buf;

        Ok(BufferCounts {
            inputs: info.n_in_buf as usize,
            outputs: info.n_out_buf as usize,
        })
    }

    fn write_input(&mut self, index: usize, data: &[u8]) -> Result<(), ExecutorError> {
        unsafe {
            check(
                enn_memcpy_host_to_device(self.buffer_set, index as i32, data.as_ptr(), data.len()),
                "enn_memcpy_host_to_device",
            )
        }
    }

    fn execute(&mut self) -> Result<(), ExecutorError> {
        unsafe { check(enn_execute_model(self.model_id), "enn_execute_model") }
    }

    fn read_output(&mut self, index: usize) -> Result<Vec<u8>, ExecutorError> {
        let layer = self.n_in_buf + index as i32;

        unsafe {
            let len = enn_buffer_size(self.buffer_set, layer);
            if len == 0 {
                return Err(ExecutorError::Runtime(format!(
                    "output layer {layer} has zero size"
                )));
            }

            let mut buffer = vec![0u8; len];
            check(
                enn_memcpy_device_to_host(self.buffer_set, layer, buffer.as_mut_ptr(), len),
                "enn_memcpy_device_to_host",
            )?;
            Ok(buffer)
        }
    }

    fn release_buffers(&mut self) {
        if self.buffer_set != 0 {
            unsafe {
                enn_release_buffers(self.buffer_set, self.n_in_buf + self.n_out_buf);
            }
            self.buffer_set = 0;
        }
    }

    fn close(&mut self) {
        unsafe {
            if self.model_id != 0 {
                enn_close_model(self.model_id);
                self.model_id = 0;
            }
            if self.initialized {
                enn_deinitialize();
                self.initialized = false;
            }
        }
    }
}
