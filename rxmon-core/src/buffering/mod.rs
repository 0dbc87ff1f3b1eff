//! Sample buffering.
//!
//! Two distinct buffers live here:
//!
//! - the lock-free SPSC **transport ring** (`ringbuf::HeapRb<f32>`) carrying
//!   raw capture samples from the cpal input callback to the output
//!   callback, where the pipeline runs. `push_slice`/`pop_slice` are
//!   wait-free and allocation-free, safe on both real-time threads.
//! - the [`playout::PlayoutBuffer`], the fixed circular buffer of processed
//!   samples awaiting playback, owned by the session state under its mutex.

pub mod playout;

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Producer};

/// Producer half — held by the cpal input callback.
pub type CaptureProducer = ringbuf::HeapProd<f32>;

/// Consumer half — held by the cpal output callback.
pub type CaptureConsumer = ringbuf::HeapCons<f32>;

/// Transport depth: 16 384 samples ≈ 340 ms at 48 kHz. Deep enough to absorb
/// scheduling jitter between the two device threads, shallow enough to keep
/// added latency bounded.
pub const TRANSPORT_CAPACITY: usize = 16_384;

/// Create a matched producer/consumer pair for the capture transport.
pub fn create_capture_ring() -> (CaptureProducer, CaptureConsumer) {
    HeapRb::<f32>::new(TRANSPORT_CAPACITY).split()
}
