mod end_to_end;
mod orchestrator;
mod transport_failures;
