mod mod_channel;
mod mod_formats;
mod mod_pipeline;
