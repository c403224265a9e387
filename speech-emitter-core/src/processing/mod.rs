pub mod ring_buffer;
pub mod voice_gate;
pub mod wav_format;
