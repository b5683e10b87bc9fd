pub mod audio_graph;
