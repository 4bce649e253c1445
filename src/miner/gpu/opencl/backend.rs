// ProgPoW GPU Miner - Free and Open Source Software Statement
//
// File: src/miner/gpu/opencl/backend.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// OpenCL ComputeBackend: one context and in-order queue per device, program
// builds with build-log capture, positional kernel arguments, u8 buffers
// addressed by BufferId, and a second queue used only to kick a running
// search kernel through the abort word of its result buffer.

use log::{debug, error, info, warn};
use opencl3::{
    command_queue::CommandQueue,
    context::Context,
    kernel::Kernel,
    memory::{Buffer, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY, ClMem},
    program::Program,
    types::{CL_FALSE, CL_TRUE, cl_mem},
};
use std::collections::HashMap;
use std::ptr;
use std::sync::{Arc, Mutex, PoisonError};

use super::device::OpenClDevice;
use crate::miner::dataset::{ABORT_WORD_OFFSET, search_args};
use crate::miner::gpu::backend::{
    BackendError, BufferAccess, BufferId, ComputeBackend, DeviceInfo, DeviceKick, KernelArg, KernelKind,
};

const LOG_TARGET: &str = "progpow::miner::opencl::backend";

type SharedBuffer = Arc<Mutex<Buffer<u8>>>;

struct AbortChannel {
    queue: CommandQueue,
    results: Option<SharedBuffer>,
}

/// Writes `1` into the abort word of the bound result buffer
pub struct OpenClKick {
    channel: Mutex<Option<AbortChannel>>,
}

impl OpenClKick {
    fn new() -> Self {
        Self {
            channel: Mutex::new(None),
        }
    }

    fn install(&self, queue: CommandQueue) {
        *self.channel.lock().unwrap_or_else(PoisonError::into_inner) = Some(AbortChannel { queue, results: None });
    }

    fn bind_results(&self, results: Option<SharedBuffer>) {
        if let Some(channel) = self.channel.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            channel.results = results;
        }
    }
}

impl DeviceKick for OpenClKick {
    fn kick(&self) {
        let guard = self.channel.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(channel) = guard.as_ref() else {
            return;
        };
        let Some(results) = &channel.results else {
            return;
        };
        let mut buffer = results.lock().unwrap_or_else(PoisonError::into_inner);
        let abort = 1u32.to_le_bytes();
        let written = unsafe {
            channel
                .queue
                .enqueue_write_buffer(&mut buffer, CL_TRUE, ABORT_WORD_OFFSET, &abort, &[])
        };
        if let Err(e) = written {
            warn!(target: LOG_TARGET, "Kick failed: {}", e);
        }
    }
}

/// OpenCL realisation of ComputeBackend for one device
pub struct OpenClBackend {
    device: OpenClDevice,
    context: Option<Context>,
    queue: Option<CommandQueue>,
    program: Option<Program>,
    kernels: HashMap<KernelKind, Kernel>,
    buffers: HashMap<BufferId, SharedBuffer>,
    next_buffer: u64,
    staging: Vec<Vec<u8>>,
    kick: Arc<OpenClKick>,
}

impl OpenClBackend {
    pub fn new(device: OpenClDevice) -> Self {
        debug!(target: LOG_TARGET, "Creating OpenCL backend for device: {}", device.name());
        Self {
            device,
            context: None,
            queue: None,
            program: None,
            kernels: HashMap::new(),
            buffers: HashMap::new(),
            next_buffer: 0,
            staging: Vec::new(),
            kick: Arc::new(OpenClKick::new()),
        }
    }

    pub fn device(&self) -> &OpenClDevice {
        &self.device
    }

    fn context(&self) -> Result<&Context, BackendError> {
        self.context.as_ref().ok_or(BackendError::NotOpened)
    }

    fn queue(&self) -> Result<&CommandQueue, BackendError> {
        self.queue.as_ref().ok_or(BackendError::NotOpened)
    }

    fn kernel(&self, kind: KernelKind) -> Result<&Kernel, BackendError> {
        self.kernels.get(&kind).ok_or(BackendError::KernelMissing(kind))
    }

    fn buffer(&self, id: BufferId) -> Result<SharedBuffer, BackendError> {
        self.buffers.get(&id).cloned().ok_or(BackendError::UnknownBuffer(id))
    }
}

impl ComputeBackend for OpenClBackend {
    fn device_info(&self) -> &DeviceInfo {
        &self.device.info
    }

    fn open(&mut self) -> Result<(), BackendError> {
        let context =
            Context::from_device(self.device.device()).map_err(|e| BackendError::runtime("create context", e))?;
        let queue =
            CommandQueue::create_default(&context, 0).map_err(|e| BackendError::runtime("create command queue", e))?;
        let abort_queue =
            CommandQueue::create_default(&context, 0).map_err(|e| BackendError::runtime("create abort queue", e))?;

        self.kick.install(abort_queue);
        self.context = Some(context);
        self.queue = Some(queue);
        info!(target: LOG_TARGET, "OpenCL context ready for {}", self.device.name());
        Ok(())
    }

    fn build_program(
        &mut self,
        source: &str,
        options: &str,
        kernels: &[(KernelKind, &str)],
    ) -> Result<(), BackendError> {
        let context = self.context()?;
        let mut program =
            Program::create_from_source(context, source).map_err(|e| BackendError::runtime("create program", e))?;

        if let Err(e) = program.build(context.devices(), options) {
            let log = context
                .devices()
                .iter()
                .filter_map(|device_id| program.get_build_log(*device_id).ok())
                .collect::<Vec<_>>()
                .join("\n");
            error!(target: LOG_TARGET, "Failed to build OpenCL program for {}: {}", self.device.name(), e);
            return Err(BackendError::BuildFailure {
                message: e.to_string(),
                log,
            });
        }

        let mut created = HashMap::new();
        for (kind, name) in kernels {
            let kernel = Kernel::create(&program, name).map_err(|e| BackendError::runtime("create kernel", e))?;
            created.insert(*kind, kernel);
        }

        self.kernels = created;
        self.program = Some(program);
        self.kick.bind_results(None);
        Ok(())
    }

    fn allocate(&mut self, size: usize, access: BufferAccess) -> Result<BufferId, BackendError> {
        let flags = match access {
            BufferAccess::ReadOnly => CL_MEM_READ_ONLY,
            BufferAccess::WriteOnly => CL_MEM_WRITE_ONLY,
            BufferAccess::ReadWrite => CL_MEM_READ_WRITE,
        };
        let buffer = unsafe { Buffer::<u8>::create(self.context()?, flags, size, ptr::null_mut()) }
            .map_err(|e| BackendError::runtime("create buffer", e))?;

        let id = BufferId(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(id, Arc::new(Mutex::new(buffer)));
        Ok(id)
    }

    fn release(&mut self, buffer: BufferId) -> Result<(), BackendError> {
        self.buffers.remove(&buffer).map(|_| ()).ok_or(BackendError::UnknownBuffer(buffer))
    }

    fn set_kernel_arg(&mut self, kernel: KernelKind, index: u32, arg: KernelArg) -> Result<(), BackendError> {
        let cl_kernel = self.kernel(kernel)?;
        let set = match arg {
            KernelArg::Buffer(id) => {
                let shared = self.buffer(id)?;
                let mem: cl_mem = shared.lock().unwrap_or_else(PoisonError::into_inner).get();
                let set = unsafe { cl_kernel.set_arg(index, &mem) };
                if kernel == KernelKind::Search && index == search_args::RESULTS {
                    self.kick.bind_results(Some(shared));
                }
                set
            }
            KernelArg::U32(value) => unsafe { cl_kernel.set_arg(index, &value) },
            KernelArg::U64(value) => unsafe { cl_kernel.set_arg(index, &value) },
        };
        set.map_err(|e| BackendError::runtime("set kernel argument", e))
    }

    fn enqueue_kernel(&mut self, kernel: KernelKind, global: usize, local: usize) -> Result<(), BackendError> {
        let queue = self.queue()?;
        let cl_kernel = self.kernel(kernel)?;
        let global_sizes = [global];
        let local_sizes = [local];
        unsafe {
            queue.enqueue_nd_range_kernel(
                cl_kernel.get(),
                1,
                ptr::null(),
                global_sizes.as_ptr(),
                local_sizes.as_ptr(),
                &[],
            )
        }
        .map(|_| ())
        .map_err(|e| BackendError::runtime("enqueue kernel", e))
    }

    fn write_buffer(&mut self, buffer: BufferId, blocking: bool, offset: usize, data: &[u8]) -> Result<(), BackendError> {
        let shared = self.buffer(buffer)?;
        let mut target = shared.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = self.queue.as_ref().ok_or(BackendError::NotOpened)?;

        if blocking {
            unsafe { queue.enqueue_write_buffer(&mut target, CL_TRUE, offset, data, &[]) }
                .map_err(|e| BackendError::runtime("write buffer", e))?;
        } else {
            // the queue reads the host copy after return; kept until finish()
            let copy = data.to_vec();
            unsafe { queue.enqueue_write_buffer(&mut target, CL_FALSE, offset, &copy, &[]) }
                .map_err(|e| BackendError::runtime("write buffer", e))?;
            self.staging.push(copy);
        }
        Ok(())
    }

    fn read_buffer(&mut self, buffer: BufferId, offset: usize, out: &mut [u8]) -> Result<(), BackendError> {
        let shared = self.buffer(buffer)?;
        let source = shared.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = self.queue()?;
        unsafe { queue.enqueue_read_buffer(&source, CL_TRUE, offset, out, &[]) }
            .map(|_| ())
            .map_err(|e| BackendError::runtime("read buffer", e))
    }

    fn finish(&mut self) -> Result<(), BackendError> {
        self.queue()?.finish().map_err(|e| BackendError::runtime("finish", e))?;
        self.staging.clear();
        Ok(())
    }

    fn kicker(&self) -> Arc<dyn DeviceKick> {
        Arc::clone(&self.kick) as Arc<dyn DeviceKick>
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): ComputeBackend over opencl3.
//   - Reworked from the SHA3x engine: no per-launch buffers, persistent
//     kernel arguments, staged non-blocking writes, abort queue for kicks.
//   - Dropped the intensity/batch autotuner.
