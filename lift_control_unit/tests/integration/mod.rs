mod lift_scenario;
mod pid_convergence;
mod serial_commands;
