pub mod live_channel;
